//! Operator capabilities for unary and binary nodes.
//!
//! An operator is any type implementing [`UnaryOp`] or [`BinaryOp`]. State
//! an operator needs (thresholds, gains, lookup tables) lives in the
//! implementing type itself. Operators are shared by every frame worker, so
//! they must be `Send + Sync` and `apply` takes `&self`.
//!
//! # Built-in operators
//!
//! | Operator | Input | Output |
//! |----------|-------|--------|
//! | [`ToGray`] | RGBA | GRAY = (r + g + b) / 3 |
//! | [`ToRgba`] | GRAY | RGBA = (v, v, v, 255) |
//! | [`Diff`] | a, b same format | per channel `255 - (b - a)` |
//! | [`AbsDiff`] | a, b same format | per channel `abs(a - b)` |
//!
//! Closures can be used directly through [`unary_fn`] and [`binary_fn`]:
//!
//! ```rust
//! use lapse_core::Sample;
//! use lapse_graph::ops::{unary_fn, UnaryOp};
//!
//! let invert = unary_fn("invert", |s: Sample| {
//!     let mut out = s;
//!     for c in out.channels_mut().iter_mut().take(3) {
//!         *c = 255.0 - *c;
//!     }
//!     Ok(out)
//! });
//! let px = invert.apply(Sample::rgba(0.0, 10.0, 255.0, 255.0)).unwrap();
//! assert_eq!(px.data, [255.0, 245.0, 0.0, 255.0]);
//! ```

use lapse_core::{Error, Result, Sample, SampleFormat};

/// Single-input per-pixel transform.
pub trait UnaryOp: Send + Sync {
    /// Short name used in logs and graph dumps.
    fn name(&self) -> &str;

    /// Transforms one sample. May change the sample format.
    fn apply(&self, input: Sample) -> Result<Sample>;
}

/// Two-input per-pixel transform.
pub trait BinaryOp: Send + Sync {
    /// Short name used in logs and graph dumps.
    fn name(&self) -> &str;

    /// Combines the samples of inputs `a` and `b` at the same coordinate.
    fn apply(&self, a: Sample, b: Sample) -> Result<Sample>;
}

/// [`UnaryOp`] backed by a closure. Built by [`unary_fn`].
pub struct FnUnary<F> {
    name: String,
    f: F,
}

impl<F> UnaryOp for FnUnary<F>
where
    F: Fn(Sample) -> Result<Sample> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, input: Sample) -> Result<Sample> {
        (self.f)(input)
    }
}

/// Wraps a closure as a [`UnaryOp`].
pub fn unary_fn<F>(name: impl Into<String>, f: F) -> FnUnary<F>
where
    F: Fn(Sample) -> Result<Sample> + Send + Sync,
{
    FnUnary {
        name: name.into(),
        f,
    }
}

/// [`BinaryOp`] backed by a closure. Built by [`binary_fn`].
pub struct FnBinary<F> {
    name: String,
    f: F,
}

impl<F> BinaryOp for FnBinary<F>
where
    F: Fn(Sample, Sample) -> Result<Sample> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, a: Sample, b: Sample) -> Result<Sample> {
        (self.f)(a, b)
    }
}

/// Wraps a closure as a [`BinaryOp`].
pub fn binary_fn<F>(name: impl Into<String>, f: F) -> FnBinary<F>
where
    F: Fn(Sample, Sample) -> Result<Sample> + Send + Sync,
{
    FnBinary {
        name: name.into(),
        f,
    }
}

/// RGBA to GRAY using the unweighted mean of red, green and blue.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToGray;

impl UnaryOp for ToGray {
    fn name(&self) -> &str {
        "to_gray"
    }

    fn apply(&self, input: Sample) -> Result<Sample> {
        input.expect_format(SampleFormat::Rgba, "to_gray")?;
        let [r, g, b, _] = input.data;
        Ok(Sample::gray((r + g + b) / 3.0))
    }
}

/// GRAY to opaque RGBA by replicating the intensity.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToRgba;

impl UnaryOp for ToRgba {
    fn name(&self) -> &str {
        "to_rgba"
    }

    fn apply(&self, input: Sample) -> Result<Sample> {
        input.expect_format(SampleFormat::Gray, "to_rgba")?;
        let v = input.data[0];
        Ok(Sample::rgba(v, v, v, 255.0))
    }
}

fn same_format(op: &str, a: &Sample, b: &Sample) -> Result<()> {
    if a.format != b.format {
        return Err(Error::format_mismatch(op, a.format, b.format));
    }
    Ok(())
}

/// Directional difference: every channel becomes `255 - (b - a)`.
///
/// This is a signed delta remapped around 255, not an absolute difference:
/// identical inputs give 255 and a brighter `b` darkens the result. Values
/// above 255 (when `a > b`) saturate when narrowed for display. Alpha is
/// treated like any other channel, so two opaque inputs stay opaque.
#[derive(Debug, Clone, Copy, Default)]
pub struct Diff;

impl BinaryOp for Diff {
    fn name(&self) -> &str {
        "diff"
    }

    fn apply(&self, a: Sample, b: Sample) -> Result<Sample> {
        same_format("diff", &a, &b)?;
        let mut out = Sample::zeroed(a.format);
        for ((o, va), vb) in out.channels_mut().iter_mut().zip(a.channels()).zip(b.channels()) {
            *o = 255.0 - (vb - va);
        }
        Ok(out)
    }
}

/// Absolute per-channel difference `abs(a - b)`.
///
/// Alpha is carried over from `a` so the result stays displayable.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbsDiff;

impl BinaryOp for AbsDiff {
    fn name(&self) -> &str {
        "abs_diff"
    }

    fn apply(&self, a: Sample, b: Sample) -> Result<Sample> {
        same_format("abs_diff", &a, &b)?;
        let mut out = Sample::zeroed(a.format);
        for ((o, va), vb) in out.channels_mut().iter_mut().zip(a.channels()).zip(b.channels()) {
            *o = (va - vb).abs();
        }
        if a.format == SampleFormat::Rgba {
            out.data[3] = a.data[3];
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_to_gray_mean() {
        let g = ToGray.apply(Sample::rgba(10.0, 20.0, 60.0, 7.0)).unwrap();
        assert_eq!(g.format, SampleFormat::Gray);
        assert_relative_eq!(g.data[0], 30.0);
    }

    #[test]
    fn test_to_gray_rejects_gray() {
        let err = ToGray.apply(Sample::gray(1.0)).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_to_rgba() {
        let c = ToRgba.apply(Sample::gray(42.0)).unwrap();
        assert_eq!(c, Sample::rgba(42.0, 42.0, 42.0, 255.0));
        assert!(ToRgba.apply(Sample::rgba(0.0, 0.0, 0.0, 0.0)).is_err());
    }

    #[test]
    fn test_gray_round_trip_is_lossy_mean() {
        let src = Sample::rgba(10.0, 20.0, 31.0, 0.0);
        let out = ToRgba.apply(ToGray.apply(src).unwrap()).unwrap();
        let m = (10.0f32 + 20.0 + 31.0) / 3.0;
        assert_relative_eq!(out.data[0], m);
        assert_relative_eq!(out.data[1], m);
        assert_relative_eq!(out.data[2], m);
        assert_eq!(out.data[3], 255.0);
        assert_eq!(out.to_rgba8(), [20, 20, 20, 255]);
    }

    #[test]
    fn test_diff_literal_triple() {
        let a = Sample::rgba(10.0, 0.0, 0.0, 255.0);
        let b = Sample::rgba(50.0, 0.0, 0.0, 255.0);
        let d = Diff.apply(a, b).unwrap();
        assert_eq!(d.data, [215.0, 255.0, 255.0, 255.0]);
        assert_eq!(d.to_rgba8(), [215, 255, 255, 255]);
    }

    #[test]
    fn test_diff_is_directional() {
        let a = Sample::rgba(50.0, 0.0, 0.0, 255.0);
        let b = Sample::rgba(10.0, 0.0, 0.0, 255.0);
        let d = Diff.apply(a, b).unwrap();
        assert_eq!(d.data[0], 295.0);
        assert_eq!(d.to_rgba8()[0], 255);
    }

    #[test]
    fn test_diff_gray() {
        let d = Diff.apply(Sample::gray(100.0), Sample::gray(30.0)).unwrap();
        assert_eq!(d.format, SampleFormat::Gray);
        assert_eq!(d.data[0], 325.0);
    }

    #[test]
    fn test_diff_format_mismatch() {
        assert!(Diff.apply(Sample::gray(0.0), Sample::rgba(0.0, 0.0, 0.0, 0.0)).is_err());
    }

    #[test]
    fn test_abs_diff() {
        let a = Sample::rgba(50.0, 10.0, 0.0, 255.0);
        let b = Sample::rgba(10.0, 50.0, 0.0, 128.0);
        let d = AbsDiff.apply(a, b).unwrap();
        assert_eq!(d.data, [40.0, 40.0, 0.0, 255.0]);
    }

    #[test]
    fn test_closure_ops() {
        let add = binary_fn("add", |a: Sample, b: Sample| {
            Ok(Sample::gray(a.data[0] + b.data[0]))
        });
        assert_eq!(add.name(), "add");
        assert_eq!(add.apply(Sample::gray(1.0), Sample::gray(2.0)).unwrap().data[0], 3.0);
    }
}
