//! Serpentine cutback test structures.
//!
//! A cutback chains many copies of a device in a folded (serpentine) line so
//! that per-device loss can be extracted by comparing structures with
//! different device counts. Rows of alternating forward and reversed devices
//! are joined by 180 degree bends; the two halves of the serpentine are joined
//! by a pair of straights.

use std::fmt::Display;
use std::sync::Arc;

use arcstr::ArcStr;
use derive_builder::Builder;
use geometry::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cell::{Cell, COMPONENT_COUNT, PARENT_NAME};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::params::{Params, Spec};
use crate::sequence::{build_sequence, SymbolTable};

/// The builder identifier under which cutback structures are cached.
pub const CUTBACK_BUILDER: &str = "cutback_component";

/// One element of a cutback sequence.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum CutbackSymbol {
    /// The device, entered through its first port.
    DeviceForward,
    /// The device, entered through its second port.
    DeviceReverse,
    /// The bend, entered through `o1`.
    BendForward,
    /// The bend, entered through `o2`.
    BendReverse,
    /// The straight, entered through `o1`.
    StraightForward,
    /// The straight, entered through `o2`.
    StraightReverse,
}

impl CutbackSymbol {
    /// All symbols.
    pub const ALL: [CutbackSymbol; 6] = [
        CutbackSymbol::DeviceForward,
        CutbackSymbol::DeviceReverse,
        CutbackSymbol::BendForward,
        CutbackSymbol::BendReverse,
        CutbackSymbol::StraightForward,
        CutbackSymbol::StraightReverse,
    ];

    /// The character representing this symbol in a sequence string.
    pub const fn as_char(self) -> char {
        match self {
            CutbackSymbol::DeviceForward => 'A',
            CutbackSymbol::DeviceReverse => 'B',
            CutbackSymbol::BendForward => 'D',
            CutbackSymbol::BendReverse => 'C',
            CutbackSymbol::StraightForward => '-',
            CutbackSymbol::StraightReverse => '_',
        }
    }

    /// Parses a sequence character.
    pub fn from_char(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_char() == c)
    }

    fn bend(forward: bool) -> Self {
        if forward {
            CutbackSymbol::BendForward
        } else {
            CutbackSymbol::BendReverse
        }
    }
}

impl Display for CutbackSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// The layout of a cutback serpentine.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum CutbackVariant {
    /// The first row turns with a forward bend.
    #[default]
    Direct,
    /// The first row turns with a reversed bend, folding the serpentine the other way.
    Mirrored,
}

impl CutbackVariant {
    fn as_str(&self) -> &'static str {
        match self {
            CutbackVariant::Direct => "direct",
            CutbackVariant::Mirrored => "mirrored",
        }
    }
}

/// Returns the symbols of a cutback with `rows` rows of `cols` device pairs per half.
///
/// Each half consists of `rows` rows of `cols` forward/reversed device pairs,
/// each row followed by a bend whose direction alternates between rows; the
/// final bend of each half is dropped. The halves are joined by a forward and
/// a reversed straight. The sequence has `2 * (2 * cols * rows + rows)`
/// symbols.
///
/// # Examples
///
/// ```
/// # use cellkit::cutback::{cutback_sequence, CutbackVariant};
/// assert_eq!(cutback_sequence(2, 1, CutbackVariant::Direct).unwrap(), "ABDAB-_ABDAB");
/// assert_eq!(cutback_sequence(2, 1, CutbackVariant::Mirrored).unwrap(), "ABCAB-_ABCAB");
/// ```
pub fn cutback_symbols(
    rows: usize,
    cols: usize,
    variant: CutbackVariant,
) -> Result<Vec<CutbackSymbol>> {
    if rows == 0 || cols == 0 {
        return Err(Error::SequenceConfig(arcstr::format!(
            "cutback needs at least one row and one column, got rows = {rows}, cols = {cols}"
        )));
    }

    let (first_half, second_half): (fn(usize) -> bool, fn(usize, usize) -> bool) = match variant {
        CutbackVariant::Direct => (|i| i % 2 == 0, |i, rows| (i + rows) % 2 == 0),
        CutbackVariant::Mirrored => (|i| i % 2 != 0, |i, rows| (i + rows + 1) % 2 == 0),
    };

    let mut symbols = Vec::with_capacity(2 * (2 * cols * rows + rows));
    let push_row = |symbols: &mut Vec<CutbackSymbol>, forward_bend: bool| {
        for _ in 0..cols {
            symbols.push(CutbackSymbol::DeviceForward);
            symbols.push(CutbackSymbol::DeviceReverse);
        }
        symbols.push(CutbackSymbol::bend(forward_bend));
    };

    for i in 0..rows {
        push_row(&mut symbols, first_half(i));
    }
    symbols.pop();
    symbols.push(CutbackSymbol::StraightForward);
    symbols.push(CutbackSymbol::StraightReverse);
    for i in 0..rows {
        push_row(&mut symbols, second_half(i, rows));
    }
    symbols.pop();

    Ok(symbols)
}

/// Returns the [cutback symbols](cutback_symbols) as a sequence string.
pub fn cutback_sequence(rows: usize, cols: usize, variant: CutbackVariant) -> Result<String> {
    Ok(cutback_symbols(rows, cols, variant)?
        .into_iter()
        .map(CutbackSymbol::as_char)
        .collect())
}

/// Parameters of a cutback structure.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct CutbackParams {
    /// The device under test.
    component: Spec,
    /// The port through which a forward device is entered.
    #[builder(default = "arcstr::literal!(\"o1\")")]
    port1: ArcStr,
    /// The port through which a forward device is exited.
    #[builder(default = "arcstr::literal!(\"o2\")")]
    port2: ArcStr,
    /// A 180 degree bend with ports `o1` and `o2`.
    bend180: Spec,
    /// A straight with ports `o1` and `o2`, joining the two halves.
    straight: Spec,
    /// Device pairs per row.
    #[builder(default = "4")]
    cols: usize,
    /// Rows per half.
    #[builder(default = "5")]
    rows: usize,
    /// The serpentine layout.
    #[builder(default)]
    variant: CutbackVariant,
}

impl CutbackParams {
    /// Returns a new [`CutbackParamsBuilder`].
    #[inline]
    pub fn builder() -> CutbackParamsBuilder {
        CutbackParamsBuilder::default()
    }

    /// Device pairs per row.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Rows per half.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// The serpentine layout.
    pub fn variant(&self) -> CutbackVariant {
        self.variant
    }

    fn params(&self) -> Params {
        Params::new()
            .with("component", self.component.clone())
            .with("port1", self.port1.clone())
            .with("port2", self.port2.clone())
            .with("bend180", self.bend180.clone())
            .with("straight", self.straight.clone())
            .with("cols", self.cols)
            .with("rows", self.rows)
            .with("variant", self.variant.as_str())
    }
}

/// Builds a cutback structure.
///
/// The serpentine is built with [`build_sequence`] and placed as the only
/// instance of the result, whose ports are those of the serpentine. The
/// result carries the device's metadata, with [`COMPONENT_COUNT`] set to the
/// sequence length minus the two joining straights and [`PARENT_NAME`] set
/// to `"loopback_{device parent name}_{count}"`.
pub fn cutback_component(ctx: &Context, params: &CutbackParams) -> Result<Arc<Cell>> {
    let symbols = cutback_symbols(params.rows, params.cols, params.variant)?;

    ctx.generate(CUTBACK_BUILDER, params.params(), |_, cell| {
        let device = ctx.resolve(&params.component)?;
        let bend = ctx.resolve(&params.bend180)?;
        let straight = ctx.resolve(&params.straight)?;

        let (o1, o2) = (arcstr::literal!("o1"), arcstr::literal!("o2"));
        let mut table = SymbolTable::new();
        for symbol in CutbackSymbol::ALL {
            let (child, input, output) = match symbol {
                CutbackSymbol::DeviceForward => (&device, &params.port1, &params.port2),
                CutbackSymbol::DeviceReverse => (&device, &params.port2, &params.port1),
                CutbackSymbol::BendForward => (&bend, &o1, &o2),
                CutbackSymbol::BendReverse => (&bend, &o2, &o1),
                CutbackSymbol::StraightForward => (&straight, &o1, &o2),
                CutbackSymbol::StraightReverse => (&straight, &o2, &o1),
            };
            table.insert(symbol.as_char(), child.clone(), input.clone(), output.clone());
        }

        let sequence: String = symbols.iter().map(|s| s.as_char()).collect();
        let serpentine = build_sequence(ctx, &sequence, &table)?;
        let id = cell.place(serpentine, Transformation::identity());
        cell.merge_ports(id, &[], None)?;

        let count = symbols.len() - 2;
        cell.copy_child_info(&device);
        cell.set_info(COMPONENT_COUNT, count);
        cell.set_info(
            PARENT_NAME,
            arcstr::format!("loopback_{}_{count}", device.parent_name()),
        );
        tracing::debug!(count, "built cutback");
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::cell::MetaValue;
    use crate::sequence::SEQUENCE_BUILDER;
    use crate::tests::{test_context, BEND180, DEVICE, STRAIGHT};

    const TOL: f64 = 1e-9;

    fn test_params(rows: usize, cols: usize, variant: CutbackVariant) -> CutbackParams {
        CutbackParams::builder()
            .component(Spec::factory(DEVICE, Params::new()))
            .bend180(Spec::factory(BEND180, Params::new()))
            .straight(Spec::factory(STRAIGHT, Params::new()))
            .rows(rows)
            .cols(cols)
            .variant(variant)
            .build()
            .unwrap()
    }

    #[test]
    fn sequence_lengths() {
        for variant in [CutbackVariant::Direct, CutbackVariant::Mirrored] {
            for rows in 1..6 {
                for cols in 1..5 {
                    let seq = cutback_symbols(rows, cols, variant).unwrap();
                    assert_eq!(seq.len(), 2 * (2 * cols * rows + rows));
                    let straights = seq
                        .iter()
                        .filter(|s| {
                            matches!(
                                s,
                                CutbackSymbol::StraightForward | CutbackSymbol::StraightReverse
                            )
                        })
                        .count();
                    assert_eq!(straights, 2);
                }
            }
        }
    }

    #[test]
    fn bends_alternate() {
        let seq = cutback_sequence(4, 2, CutbackVariant::Direct).unwrap();
        assert_eq!(seq, "ABABDABABCABABDABAB-_ABABDABABCABABDABAB");
        let seq = cutback_sequence(3, 1, CutbackVariant::Direct).unwrap();
        assert_eq!(seq, "ABDABCAB-_ABCABDAB");
        let seq = cutback_sequence(3, 1, CutbackVariant::Mirrored).unwrap();
        assert_eq!(seq, "ABCABDAB-_ABDABCAB");
    }

    #[test]
    fn empty_grid_is_rejected() {
        assert!(matches!(
            cutback_symbols(0, 3, CutbackVariant::Direct),
            Err(Error::SequenceConfig(_))
        ));
        assert!(matches!(
            cutback_symbols(3, 0, CutbackVariant::Mirrored),
            Err(Error::SequenceConfig(_))
        ));
    }

    #[test]
    fn symbol_chars_round_trip() {
        for symbol in CutbackSymbol::ALL {
            assert_eq!(CutbackSymbol::from_char(symbol.as_char()), Some(symbol));
        }
        assert_eq!(CutbackSymbol::from_char('x'), None);
    }

    #[test]
    fn builder_defaults() {
        let params = CutbackParams::builder()
            .component(Spec::factory(DEVICE, Params::new()))
            .bend180(Spec::factory(BEND180, Params::new()))
            .straight(Spec::factory(STRAIGHT, Params::new()))
            .build()
            .unwrap();
        assert_eq!((params.rows(), params.cols()), (5, 4));
        assert_eq!(params.variant(), CutbackVariant::Direct);
        assert!(CutbackParams::builder().build().is_err());
    }

    #[crate::test]
    fn builds_worked_example() {
        let ctx = test_context();
        let cutback = cutback_component(&ctx, &test_params(2, 1, CutbackVariant::Direct)).unwrap();

        let serpentine = cutback.instances()[0].cell();
        assert_eq!(serpentine.instances().len(), 12);
        assert_eq!(cutback.info(COMPONENT_COUNT), Some(&MetaValue::Int(10)));
        assert_eq!(cutback.parent_name(), "loopback_device_10");
        // Copied from the device.
        assert_eq!(cutback.info("loss_db"), Some(&MetaValue::Float(0.2)));

        let names: Vec<_> = cutback.port_names().map(|n| n.to_string()).collect();
        assert_eq!(names, ["o1", "o2"]);
        let input = cutback.port("o1").unwrap();
        assert_abs_diff_eq!(input.center(), Point::new(0., 0.), epsilon = TOL);
        assert_abs_diff_eq!(input.orientation(), 180., epsilon = TOL);
        // Each half folds back once; the halves are joined by two straights.
        let output = cutback.port("o2").unwrap();
        assert_abs_diff_eq!(output.center(), Point::new(-20., 0.), epsilon = TOL);
        assert_abs_diff_eq!(output.orientation(), 0., epsilon = TOL);
    }

    #[crate::test]
    fn mirrored_folds_the_other_way() {
        let ctx = test_context();
        let direct = cutback_component(&ctx, &test_params(2, 1, CutbackVariant::Direct)).unwrap();
        let mirrored =
            cutback_component(&ctx, &test_params(2, 1, CutbackVariant::Mirrored)).unwrap();
        let offsets = |cell: &Arc<Cell>| -> Vec<f64> {
            cell.instances()[0]
                .cell()
                .instances()
                .iter()
                .map(|inst| inst.transformation().offset_point().y)
                .collect()
        };
        let direct = offsets(&direct);
        let mirrored = offsets(&mirrored);
        assert!(direct.iter().all(|y| *y > -TOL));
        assert!(direct.iter().any(|y| *y > 1.));
        assert!(mirrored.iter().all(|y| *y < TOL));
        assert!(mirrored.iter().any(|y| *y < -1.));
    }

    #[crate::test]
    fn memoized_under_cutback_signature() {
        let ctx = test_context();
        let a = cutback_component(&ctx, &test_params(2, 2, CutbackVariant::Direct)).unwrap();
        let b = cutback_component(&ctx, &test_params(2, 2, CutbackVariant::Direct)).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(ctx.build_count(CUTBACK_BUILDER), 1);
        assert_eq!(ctx.build_count(SEQUENCE_BUILDER), 1);
        assert_eq!(ctx.build_count(DEVICE), 1);

        // Passing the device directly describes the same structure.
        let device = ctx.get_or_build(DEVICE, Params::new()).unwrap();
        let direct = CutbackParams::builder()
            .component(device)
            .bend180(Spec::factory(BEND180, Params::new()))
            .straight(Spec::factory(STRAIGHT, Params::new()))
            .rows(2usize)
            .cols(2usize)
            .build()
            .unwrap();
        let c = cutback_component(&ctx, &direct).unwrap();
        assert!(Arc::ptr_eq(&a, &c));
    }

    #[crate::test]
    fn invalid_grid_places_nothing() {
        let ctx = test_context();
        let err = cutback_component(&ctx, &test_params(0, 1, CutbackVariant::Direct)).unwrap_err();
        assert!(matches!(err, Error::SequenceConfig(_)));
        assert!(ctx.is_empty());
    }
}
