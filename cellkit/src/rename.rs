//! Deterministic port naming.
//!
//! Ports are grouped by the side they face and numbered side by side in
//! the order west, south, east, north. West and east ports are ordered by
//! y, south and north ports by x, all ascending:
//!
//! ```text
//!           7   8
//!          _|___|_
//!     2 --|       |-- 6
//!         |       |
//!     1 --|_______|-- 5
//!           |   |
//!           3   4
//! ```

use geometry::prelude::*;
use indexmap::IndexMap;

use crate::cell::CellBuilder;
use crate::port::Port;

/// Returns `ports` in canonical order.
///
/// Ports are partitioned by facing side in the order west, south, east,
/// north. Within a side, ports are sorted by their coordinate along the
/// side (y for west/east, x for south/north), then by their coordinate
/// across it. Coordinates closer than `tolerance` to a neighboring value
/// compare equal, so ties chain: `0`, `0.8 * tolerance` and
/// `1.6 * tolerance` all tie. Ports that still tie keep their relative order.
pub fn canonical_order<'a>(ports: impl IntoIterator<Item = &'a Port>, tolerance: f64) -> Vec<&'a Port> {
    let mut sides: Sides<Vec<&Port>> = Sides::uniform_cloned(Vec::new());
    for port in ports {
        sides[port.facing()].push(port);
    }

    let mut out = Vec::new();
    for side in Side::ALL {
        let ports = std::mem::take(&mut sides[side]);
        let along: Vec<f64> = ports.iter().map(|p| p.center().coord(side.along())).collect();
        let along = tie_ranks(&along, tolerance);

        // Across-side ties are only resolved among ports sharing an along-side rank.
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for (i, &rank) in along.iter().enumerate() {
            if groups.len() <= rank {
                groups.resize_with(rank + 1, Vec::new);
            }
            groups[rank].push(i);
        }
        for group in groups {
            let across: Vec<f64> = group
                .iter()
                .map(|&i| ports[i].center().coord(side.across()))
                .collect();
            let across = tie_ranks(&across, tolerance);
            let mut order: Vec<usize> = (0..group.len()).collect();
            order.sort_by_key(|&j| across[j]);
            out.extend(order.into_iter().map(|j| ports[group[j]]));
        }
    }
    out
}

/// Ranks `values` ascending, giving values within `tolerance` of their
/// sorted neighbor the same rank.
fn tie_ranks(values: &[f64], tolerance: f64) -> Vec<usize> {
    let mut sorted: Vec<usize> = (0..values.len()).collect();
    sorted.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0; values.len()];
    let mut rank = 0;
    for pair in sorted.windows(2) {
        if values[pair[1]] - values[pair[0]] > tolerance {
            rank += 1;
        }
        ranks[pair[1]] = rank;
    }
    ranks
}

/// Renames all ports of `cell` to `{prefix}1`, `{prefix}2`, ... in
/// [canonical order](canonical_order).
///
/// The prefix and tolerance come from the cell's context configuration.
/// Renaming is idempotent and does not depend on the order in which ports
/// were added, except to break exact geometric ties.
pub fn auto_rename_ports(cell: &mut CellBuilder) {
    let config = cell.ctx().config();
    let prefix = config.port_prefix.clone();
    let tolerance = config.tolerance;

    let ports: IndexMap<_, _> = canonical_order(cell.ports.values(), tolerance)
        .into_iter()
        .enumerate()
        .map(|(i, port)| {
            let name = arcstr::format!("{prefix}{}", i + 1);
            (name.clone(), port.clone().with_name(name))
        })
        .collect();
    cell.ports = ports;
}

impl CellBuilder {
    /// Renames all ports of this cell. See [`auto_rename_ports`].
    pub fn auto_rename_ports(&mut self) {
        auto_rename_ports(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::context::Context;
    use crate::params::Params;

    fn box_ports() -> Vec<Port> {
        vec![
            Port::new("n_right", (7., 10.), 90., 1.),
            Port::new("e_low", (10., 2.), 0., 1.),
            Port::new("w_high", (0., 8.), 180., 1.),
            Port::new("s_left", (3., 0.), 270., 1.),
            Port::new("w_low", (0., 2.), 180., 1.),
            Port::new("n_left", (3., 10.), 90., 1.),
            Port::new("s_right", (7., 0.), -90., 1.),
            Port::new("e_high", (10., 8.), 360., 1.),
        ]
    }

    fn renamed(ctx: &Context, ports: Vec<Port>) -> Vec<(String, String)> {
        let original: Vec<_> = ports.iter().map(|p| p.name().to_string()).collect();
        let cell = ctx
            .generate(
                "renamed",
                Params::new().with("order", original.join(",")),
                |_, cell| {
                    for port in ports {
                        cell.add_port(port)?;
                    }
                    cell.auto_rename_ports();
                    Ok(())
                },
            )
            .unwrap();
        // Map new names back to the original port through its position.
        cell.ports()
            .map(|p| {
                let original = box_ports()
                    .into_iter()
                    .find(|q| q.center() == p.center())
                    .unwrap();
                (p.name().to_string(), original.name().to_string())
            })
            .collect()
    }

    #[test]
    fn orders_west_south_east_north() {
        let ctx = Context::new();
        let names = renamed(&ctx, box_ports());
        let expected = [
            ("o1", "w_low"),
            ("o2", "w_high"),
            ("o3", "s_left"),
            ("o4", "s_right"),
            ("o5", "e_low"),
            ("o6", "e_high"),
            ("o7", "n_left"),
            ("o8", "n_right"),
        ];
        let expected: Vec<_> = expected
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn independent_of_insertion_order() {
        let ctx = Context::new();
        let forward = renamed(&ctx, box_ports());
        let mut reversed = box_ports();
        reversed.reverse();
        assert_eq!(renamed(&ctx, reversed), forward);
    }

    #[test]
    fn idempotent() {
        let ctx = Context::new();
        let once = ctx
            .generate("once", Params::new(), |_, cell| {
                for port in box_ports() {
                    cell.add_port(port)?;
                }
                cell.auto_rename_ports();
                let first: Vec<Port> = cell.ports().cloned().collect();
                cell.auto_rename_ports();
                let second: Vec<Port> = cell.ports().cloned().collect();
                assert_eq!(first, second);
                Ok(())
            })
            .unwrap();
        assert_eq!(once.ports().count(), 8);
    }

    #[test]
    fn boundary_angles() {
        let ports = [
            Port::new("a", (0., 0.), 45., 1.),
            Port::new("b", (0., 1.), 135., 1.),
            Port::new("c", (0., 2.), 225., 1.),
            Port::new("d", (0., 3.), 315., 1.),
        ];
        let order: Vec<_> = canonical_order(&ports, 1e-9)
            .into_iter()
            .map(|p| p.name().as_str())
            .collect();
        // 135 is west, 225 south, 315 east, 45 north.
        assert_eq!(order, ["b", "c", "d", "a"]);
    }

    #[test]
    fn near_ties_compare_equal() {
        // Equal to within tolerance along the side; ordered by the across-side coordinate.
        let ports = [
            Port::new("far", (1., 5. + 1e-12), 180., 1.),
            Port::new("near", (0., 5.), 180., 1.),
        ];
        let order: Vec<_> = canonical_order(&ports, 1e-9)
            .into_iter()
            .map(|p| p.name().as_str())
            .collect();
        assert_eq!(order, ["near", "far"]);
    }

    #[test]
    fn ties_straddling_a_grid_midpoint() {
        // 1.4e-9 and 1.6e-9 round to different multiples of the tolerance
        // but are within it of each other.
        let ports = [
            Port::new("far", (1., 1.4e-9), 180., 1.),
            Port::new("near", (0., 1.6e-9), 180., 1.),
        ];
        let order: Vec<_> = canonical_order(&ports, 1e-9)
            .into_iter()
            .map(|p| p.name().as_str())
            .collect();
        assert_eq!(order, ["near", "far"]);
    }

    #[test]
    fn across_ties_ignore_other_rows() {
        // "mid" chains 0 and 2 together across the side, but sits in another row.
        let ports = [
            Port::new("b", (2., 0.), 180., 1.),
            Port::new("mid", (1., 10.), 180., 1.),
            Port::new("a", (0., 0.), 180., 1.),
        ];
        let order: Vec<_> = canonical_order(&ports, 1.)
            .into_iter()
            .map(|p| p.name().as_str())
            .collect();
        assert_eq!(order, ["a", "b", "mid"]);
    }

    #[test]
    fn tie_ranks_chain_through_neighbors() {
        assert_eq!(tie_ranks(&[3., 0., 0.8, 1.6, 5.], 1.), [1, 0, 0, 0, 2]);
        assert_eq!(tie_ranks(&[], 1.), Vec::<usize>::new());
        assert_eq!(tie_ranks(&[2., -2.], 1e-9), [1, 0]);
    }

    #[test]
    fn uses_configured_prefix() {
        let config = Config {
            port_prefix: "p".to_string(),
            ..Default::default()
        };
        let ctx = Context::builder().config(config).build();
        let cell = ctx
            .generate("prefixed", Params::new(), |_, cell| {
                cell.add_port(Port::new("x", (0., 0.), 0., 1.))?;
                cell.auto_rename_ports();
                Ok(())
            })
            .unwrap();
        assert!(cell.has_port("p1"));
    }
}
