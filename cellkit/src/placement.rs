//! Placing child cells by connecting their ports.

use std::collections::HashSet;
use std::sync::Arc;

use arcstr::ArcStr;
use geometry::prelude::*;

use crate::cell::{Cell, CellBuilder, InstanceId};
use crate::error::{Error, Result};
use crate::port::Port;

/// Options controlling how two ports are mated.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct MateOptions {
    /// Reflect the child about its x-axis before rotating it.
    pub mirror: bool,
    /// Connect ports even if their widths differ.
    pub allow_width_mismatch: bool,
    /// Connect ports even if their cross sections differ.
    pub allow_cross_section_mismatch: bool,
}

impl MateOptions {
    /// Options that mirror the child.
    pub fn mirrored() -> Self {
        Self {
            mirror: true,
            ..Default::default()
        }
    }
}

/// Computes the transformation that places `port` on `anchor`, facing it.
///
/// The child is optionally reflected about its x-axis, then rotated by
/// `anchor.orientation - port.orientation + 180` degrees (using the
/// reflected port orientation when mirroring), then translated so the port
/// center lands on the anchor center.
///
/// # Examples
///
/// ```
/// # use cellkit::placement::mate_transformation;
/// # use cellkit::port::Port;
/// # use geometry::prelude::*;
/// let port = Port::new("o1", (0., 0.), 180., 0.5);
/// let anchor = Port::new("o2", (10., 0.), 0., 0.5);
/// let trans = mate_transformation(&port, &anchor, false);
/// assert!(port.transform(trans).is_mated_to(&anchor, 1e-9));
/// ```
pub fn mate_transformation(port: &Port, anchor: &Port, mirror: bool) -> Transformation {
    let port_orientation = if mirror {
        -port.orientation()
    } else {
        port.orientation()
    };
    let angle = anchor.orientation() - port_orientation + 180.;
    let rotated = Transformation::from_opts(Point::zero(), mirror, angle);
    let offset = anchor.center() - port.center().transform(rotated);
    Transformation::from_opts(offset, mirror, angle)
}

impl CellBuilder {
    /// Places `child` so that its port `port` mates with `anchor`.
    ///
    /// Fails without modifying this cell if the port does not exist or the
    /// ports are incompatible.
    pub fn connect(&mut self, child: Arc<Cell>, port: &str, anchor: &Port) -> Result<InstanceId> {
        self.connect_with(child, port, anchor, MateOptions::default())
    }

    /// Places `child` so that its port `port` mates with `anchor`, using the given options.
    pub fn connect_with(
        &mut self,
        child: Arc<Cell>,
        port: &str,
        anchor: &Port,
        options: MateOptions,
    ) -> Result<InstanceId> {
        let trans = {
            let p = child.port(port)?;
            self.check_mate(p, anchor, options)?;
            mate_transformation(p, anchor, options.mirror)
        };
        tracing::trace!(
            child = %child.name(),
            port,
            anchor = %anchor.name(),
            "connecting instance"
        );
        Ok(self.place(child, trans))
    }

    fn check_mate(&self, port: &Port, anchor: &Port, options: MateOptions) -> Result<()> {
        let tolerance = self.ctx().config().tolerance;
        let mut port = port.clone();
        if options.allow_width_mismatch {
            port = port.with_width(anchor.width());
        }
        if options.allow_cross_section_mismatch {
            port = port.with_cross_section(anchor.cross_section().clone());
        }
        port.check_compatible(anchor, tolerance)
            .map_err(|mismatch| Error::IncompatiblePorts {
                port: port.name().clone(),
                anchor: anchor.name().clone(),
                mismatch,
            })
    }

    /// Adds every port of an instance not named in `exclude` to this cell.
    ///
    /// Ports are transformed into this cell's coordinates and renamed
    /// `prefix + name` when a prefix is given. If any resulting name is
    /// already taken, no ports are added.
    pub fn merge_ports(
        &mut self,
        instance: InstanceId,
        exclude: &[&str],
        prefix: Option<&str>,
    ) -> Result<()> {
        let ports: Vec<Port> = self
            .instance(instance)?
            .ports()
            .filter(|port| !exclude.contains(&port.name().as_str()))
            .collect();
        self.add_ports(ports, prefix)
    }

    /// Adds a list of ports to this cell, renamed `prefix + name` when a prefix is given.
    ///
    /// If any resulting name is already taken, no ports are added.
    pub fn add_ports(
        &mut self,
        ports: impl IntoIterator<Item = Port>,
        prefix: Option<&str>,
    ) -> Result<()> {
        let ports: Vec<Port> = ports
            .into_iter()
            .map(|port| match prefix {
                Some(prefix) => {
                    let name: ArcStr = arcstr::format!("{prefix}{}", port.name());
                    port.with_name(name)
                }
                None => port,
            })
            .collect();

        let mut seen = HashSet::new();
        for port in ports.iter() {
            if self.ports.contains_key(port.name()) || !seen.insert(port.name().clone()) {
                return Err(Error::PortNameCollision(port.name().clone()));
            }
        }
        for port in ports {
            self.ports.insert(port.name().clone(), port);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::context::Context;
    use crate::params::Params;
    use crate::port::CrossSection;
    use crate::tests::{test_context, STRAIGHT};

    const TOL: f64 = 1e-9;

    #[test]
    fn mates_at_arbitrary_angles() {
        for (port_angle, anchor_angle) in [
            (0., 0.),
            (180., 0.),
            (90., 270.),
            (33.3, 271.8),
            (359.9, 0.1),
            (-45., 137.),
            (12.5, 12.5),
        ] {
            let port = Port::new("p", (3.7, -1.2), port_angle, 1.);
            let anchor = Port::new("a", (-20.25, 8.125), anchor_angle, 1.);
            for mirror in [false, true] {
                let trans = mate_transformation(&port, &anchor, mirror);
                assert_eq!(trans.is_reflected(), mirror);
                let mated = port.clone().transform(trans);
                assert_abs_diff_eq!(mated.center(), anchor.center(), epsilon = TOL);
                assert!(
                    mated.is_mated_to(&anchor, TOL),
                    "{port_angle} onto {anchor_angle} (mirror = {mirror}) gave {}",
                    mated.orientation()
                );
            }
        }
    }

    #[test]
    fn mirroring_reflects_other_ports() {
        // An L-shaped child: input facing west, output facing north.
        let input = Port::new("o1", (0., 0.), 180., 1.);
        let output = Port::new("o2", (5., 5.), 90., 1.);
        let anchor = Port::new("a", (0., 0.), 0., 1.);

        let plain = mate_transformation(&input, &anchor, false);
        let out = output.clone().transform(plain);
        assert_abs_diff_eq!(out.center(), Point::new(5., 5.), epsilon = TOL);
        assert_abs_diff_eq!(out.orientation(), 90., epsilon = TOL);

        let mirrored = mate_transformation(&input, &anchor, true);
        let out = output.transform(mirrored);
        assert_abs_diff_eq!(out.center(), Point::new(5., -5.), epsilon = TOL);
        assert_abs_diff_eq!(out.orientation(), 270., epsilon = TOL);
    }

    #[crate::test]
    fn connect_places_instance() {
        let ctx = test_context();
        let wg = ctx
            .get_or_build(STRAIGHT, Params::new().with("length", 10.))
            .unwrap();
        let top = ctx
            .generate("two_straights", Params::new(), |_, cell| {
                let first = cell.place(wg.clone(), Transformation::identity());
                let anchor = cell.instance(first)?.port("o2")?;
                let second = cell.connect(wg.clone(), "o1", &anchor)?;
                let end = cell.instance(second)?.port("o2")?;
                assert_abs_diff_eq!(end.center(), Point::new(20., 0.), epsilon = TOL);
                assert_abs_diff_eq!(end.orientation(), 0., epsilon = TOL);
                Ok(())
            })
            .unwrap();
        assert_eq!(top.instances().len(), 2);
    }

    #[crate::test]
    fn incompatible_ports_leave_parent_unmodified() {
        let ctx = test_context();
        let narrow = ctx
            .get_or_build(STRAIGHT, Params::new().with("width", 0.5))
            .unwrap();
        let wide = ctx
            .get_or_build(STRAIGHT, Params::new().with("width", 3.))
            .unwrap();
        ctx.generate("mismatch", Params::new(), |_, cell| {
            let first = cell.place(narrow.clone(), Transformation::identity());
            let anchor = cell.instance(first)?.port("o2")?;
            let err = cell.connect(wide.clone(), "o1", &anchor).unwrap_err();
            assert!(matches!(err, Error::IncompatiblePorts { .. }));
            assert_eq!(cell.instances().len(), 1);

            let err = cell.connect(wide.clone(), "missing", &anchor).unwrap_err();
            assert!(matches!(err, Error::PortNotFound { .. }));
            assert_eq!(cell.instances().len(), 1);

            let options = MateOptions {
                allow_width_mismatch: true,
                ..Default::default()
            };
            cell.connect_with(wide.clone(), "o1", &anchor, options)?;
            assert_eq!(cell.instances().len(), 2);
            Ok(())
        })
        .unwrap();
    }

    #[crate::test]
    fn cross_section_mismatch_can_be_overridden() {
        let ctx = Context::new();
        let rib = Port::new("a", (0., 0.), 0., 0.5).with_cross_section(CrossSection::new("rib"));
        ctx.register("strip_stub", |_, cell| {
            cell.add_port(Port::new("o1", (0., 0.), 180., 0.5))
        });
        let stub = ctx.get_or_build("strip_stub", Params::new()).unwrap();
        ctx.generate("xs", Params::new(), |_, cell| {
            assert!(matches!(
                cell.connect(stub.clone(), "o1", &rib),
                Err(Error::IncompatiblePorts { .. })
            ));
            let options = MateOptions {
                allow_cross_section_mismatch: true,
                ..Default::default()
            };
            cell.connect_with(stub.clone(), "o1", &rib, options)?;
            Ok(())
        })
        .unwrap();
    }

    #[crate::test]
    fn merge_ports_is_atomic() {
        let ctx = test_context();
        let wg = ctx.get_or_build(STRAIGHT, Params::new()).unwrap();
        ctx.generate("merge", Params::new(), |_, cell| {
            let a = cell.place(wg.clone(), Transformation::translate(0., 0.));
            let b = cell.place(wg.clone(), Transformation::translate(0., 10.));
            cell.merge_ports(a, &["o2"], None)?;
            assert_eq!(cell.ports().count(), 1);

            // `o1` collides, so `o2` must not be added either.
            let err = cell.merge_ports(b, &[], None).unwrap_err();
            assert!(matches!(err, Error::PortNameCollision(ref name) if name == "o1"));
            assert_eq!(cell.ports().count(), 1);

            cell.merge_ports(b, &[], Some("b_"))?;
            let names: Vec<_> = cell.ports().map(|p| p.name().to_string()).collect();
            assert_eq!(names, ["o1", "b_o1", "b_o2"]);
            assert_abs_diff_eq!(cell.port("b_o1")?.center(), Point::new(0., 10.), epsilon = TOL);
            Ok(())
        })
        .unwrap();
    }
}
