//! Graph semantics over whole frames: delays, shape checks, operator errors.

use std::sync::Arc;

use lapse_core::{Error, PixelBuffer, Sample, SampleFormat};
use lapse_graph::{
    DelayDiffPreset, Diff, Graph, PresetOptions, ToGray, ToRgba, binary_fn, run_frame_serial, unary_fn,
};

/// Fills `buf` with a pattern that depends on the frame index.
fn paint(buf: &PixelBuffer, frame: u32) {
    let (w, h) = buf.dimensions();
    for y in 0..h {
        for x in 0..w {
            let v = (frame * 7 + x * 3 + y * 5) as u8;
            buf.set_pixel(x, y, [v, v.wrapping_add(1), v.wrapping_mul(2), 255]);
        }
    }
}

fn expected(frame: u32, x: u32, y: u32) -> [u8; 4] {
    let v = (frame * 7 + x * 3 + y * 5) as u8;
    [v, v.wrapping_add(1), v.wrapping_mul(2), 255]
}

// ============================================================================
// Delay semantics
// ============================================================================

#[test]
fn delay_returns_frame_t_minus_k() {
    for k in [0usize, 1, 3, 5] {
        let input = Arc::new(PixelBuffer::rgba8(5, 4));
        let output = Arc::new(PixelBuffer::rgba8(5, 4));
        let mut g = Graph::new();
        let src = g.import(input.clone()).unwrap();
        let late = g.delay(src, k).unwrap();
        let out = g.export(output.clone(), late).unwrap();

        for t in 0..12u32 {
            paint(&input, t);
            run_frame_serial(&mut g, &[out]).unwrap();
            for y in 0..4 {
                for x in 0..5 {
                    let want = if (t as usize) >= k {
                        expected(t - k as u32, x, y)
                    } else {
                        [0, 0, 0, 0]
                    };
                    assert_eq!(output.pixel(x, y), want, "k={k} t={t} at ({x},{y})");
                }
            }
        }
    }
}

#[test]
fn delay_of_gray_stream() {
    let input = Arc::new(PixelBuffer::rgba8(3, 1));
    let output = Arc::new(PixelBuffer::rgba8(3, 1));
    let mut g = Graph::new();
    let src = g.import(input.clone()).unwrap();
    let gray = g.unary(src, ToGray).unwrap();
    let late = g.delay(gray, 2).unwrap();
    let rgba = g.unary(late, ToRgba).unwrap();
    let out = g.export(output.clone(), rgba).unwrap();

    let frames = [[30u8, 30, 30, 255], [60, 60, 60, 255], [90, 90, 90, 255], [120, 120, 120, 255]];
    let mut seen = Vec::new();
    for px in frames {
        input.fill(px);
        run_frame_serial(&mut g, &[out]).unwrap();
        seen.push(output.pixel(2, 0));
    }
    assert_eq!(
        seen,
        vec![[0, 0, 0, 255], [0, 0, 0, 255], [30, 30, 30, 255], [60, 60, 60, 255]]
    );
}

#[test]
fn delay_rejects_format_drift() {
    let input = Arc::new(PixelBuffer::filled(2, 2, [10, 10, 10, 255]));
    let mut g = Graph::new();
    let src = g.import(input.clone()).unwrap();
    // Gray at (0, 0) only, RGBA elsewhere.
    let odd = g
        .unary(
            src,
            unary_fn("odd", |s: Sample| {
                if s.data[0] == 0.0 {
                    Ok(Sample::gray(0.0))
                } else {
                    Ok(s)
                }
            }),
        )
        .unwrap();
    input.set_pixel(0, 0, [0, 0, 0, 255]);
    let late = g.delay(odd, 1).unwrap();
    assert_eq!(g.sample(late, 0, 0).unwrap().format, SampleFormat::Gray);
    let err = g.sample(late, 1, 0).unwrap_err();
    assert!(matches!(err, Error::FormatMismatch { .. }));
}

#[test]
fn delay_rejects_zero_area() {
    let mut g = Graph::new();
    let src = g.import(Arc::new(PixelBuffer::rgba8(0, 4))).unwrap();
    assert!(matches!(g.delay(src, 3), Err(Error::InvalidDimensions { .. })));
}

// ============================================================================
// Construction checks
// ============================================================================

#[test]
fn nested_binary_mismatch_fails_before_sampling() {
    let a = Arc::new(PixelBuffer::rgba8(8, 8));
    let b = Arc::new(PixelBuffer::rgba8(8, 8));
    let c = Arc::new(PixelBuffer::rgba8(8, 7));
    let mut g = Graph::new();
    let ia = g.import(a).unwrap();
    let ib = g.import(b).unwrap();
    let ic = g.import(c).unwrap();
    let ab = g.binary(ia, ib, Diff).unwrap();
    let err = g.binary(ab, ic, Diff).unwrap_err();
    assert!(err.is_construction_error());
    assert!(err.to_string().contains("8x8 vs 8x7"));
}

#[test]
fn shared_import_fan_out() {
    let input = Arc::new(PixelBuffer::filled(4, 4, [100, 50, 25, 255]));
    let out = Arc::new(PixelBuffer::rgba8(4, 4));
    let mut g = Graph::new();
    let src = g.import(input).unwrap();
    let both = g.binary(src, src, Diff).unwrap();
    let e = g.export(out.clone(), both).unwrap();
    run_frame_serial(&mut g, &[e]).unwrap();
    assert!(out.pixels().all(|px| px == [255, 255, 255, 255]));
}

// ============================================================================
// Evaluation errors
// ============================================================================

#[test]
fn failing_operator_leaves_delay_position_unchanged() {
    let input = Arc::new(PixelBuffer::filled(4, 2, [1, 1, 1, 255]));
    let out = Arc::new(PixelBuffer::rgba8(4, 2));
    let mut g = Graph::new();
    let src = g.import(input.clone()).unwrap();
    let late = g.delay(src, 2).unwrap();
    let pick = g
        .binary(
            src,
            late,
            binary_fn("fail_on_7", |a: Sample, _b: Sample| {
                if a.data[0] == 7.0 {
                    Err(Error::format_mismatch("fail_on_7", SampleFormat::Gray, a.format))
                } else {
                    Ok(a)
                }
            }),
        )
        .unwrap();
    let e = g.export(out, pick).unwrap();

    run_frame_serial(&mut g, &[e]).unwrap();
    assert_eq!(g.delay_position(late), Some(1));

    input.set_pixel(3, 1, [7, 0, 0, 255]);
    let err = run_frame_serial(&mut g, &[e]).unwrap_err();
    assert!(err.is_format_error());
    assert_eq!(g.delay_position(late), Some(1));
    assert_eq!(g.frames_finished(), 1);
}

// ============================================================================
// Preset
// ============================================================================

#[test]
fn preset_panels_track_input() {
    let input = Arc::new(PixelBuffer::rgba8(6, 3));
    let options = PresetOptions {
        delay_frames: 2,
        ..PresetOptions::default()
    };
    let mut preset = DelayDiffPreset::build(input.clone(), &options).unwrap();

    for t in 0..5u32 {
        paint(&input, t);
        preset.run_serial().unwrap();
        let live = preset.panel("live").unwrap().buffer.pixel(4, 2);
        let delayed = preset.panel("delayed").unwrap().buffer.pixel(4, 2);
        let diff = preset.panel("diff").unwrap().buffer.pixel(4, 2);

        assert_eq!(live, expected(t, 4, 2));
        let want_delayed = if t >= 2 { expected(t - 2, 4, 2) } else { [0; 4] };
        assert_eq!(delayed, want_delayed);
        for c in 0..4 {
            let v = 255.0 - (delayed[c] as f32 - live[c] as f32);
            assert_eq!(diff[c], v as u8, "t={t} channel {c}");
        }
    }
    assert_eq!(preset.graph.frames_finished(), 5);
    assert_eq!(preset.graph.delay_position(preset.delay), Some(5 % 3));
}
