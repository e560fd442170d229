//! Extending a list of ports with copies of a cell.

use std::sync::Arc;

use arcstr::ArcStr;

use crate::cell::Cell;
use crate::context::Context;
use crate::error::Result;
use crate::params::{Param, Params, Spec};
use crate::port::Port;

/// The builder identifier under which port extensions are cached.
pub const EXTEND_BUILDER: &str = "extend_ports_list";

fn port_param(port: &Port) -> Param {
    Params::new()
        .with("name", port.name().clone())
        .with("x", port.center().x)
        .with("y", port.center().y)
        .with("orientation", port.orientation())
        .with("width", port.width())
        .with(
            "layer",
            vec![
                Param::from(port.layer().0 as i64),
                Param::from(port.layer().1 as i64),
            ],
        )
        .with("cross_section", port.cross_section().name().clone())
        .into()
}

/// Connects one copy of `extension` to each port in `ports`.
///
/// Port `extension_port` of the `i`-th copy is mated to `ports[i]`. Every
/// port of every copy, including the connected one, is exposed as
/// `"{i}_{name}"` before all ports are [renamed](crate::rename::auto_rename_ports).
pub fn extend_ports_list(
    ctx: &Context,
    ports: &[Port],
    extension: &Spec,
    extension_port: impl Into<ArcStr>,
) -> Result<Arc<Cell>> {
    let extension_port = extension_port.into();
    let params = Params::new()
        .with("ports", ports.iter().map(port_param).collect::<Vec<_>>())
        .with("extension", extension.clone())
        .with("extension_port", extension_port.clone());

    ctx.generate(EXTEND_BUILDER, params, |_, cell| {
        let extension = ctx.resolve(extension)?;
        for (i, port) in ports.iter().enumerate() {
            let id = cell.connect(extension.clone(), &extension_port, port)?;
            cell.merge_ports(id, &[], Some(format!("{i}_").as_str()))?;
        }
        cell.auto_rename_ports();
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use geometry::prelude::*;

    use super::*;
    use crate::error::Error;
    use crate::tests::{test_context, STRAIGHT};

    const TOL: f64 = 1e-9;

    #[crate::test]
    fn extends_each_port() {
        let ctx = test_context();
        let ports = [
            Port::new("a", (0., 0.), 180., 0.5),
            Port::new("b", (0., 5.), 180., 0.5),
        ];
        let ext = Spec::factory(STRAIGHT, Params::new().with("length", 3.));
        let cell = extend_ports_list(&ctx, &ports, &ext, "o1").unwrap();

        assert_eq!(cell.instances().len(), 2);
        for (inst, port) in cell.instances().iter().zip(ports.iter()) {
            assert!(inst.port("o1").unwrap().is_mated_to(port, TOL));
            let far = inst.port("o2").unwrap();
            assert_abs_diff_eq!(
                far.center(),
                port.center() + Point::new(-3., 0.),
                epsilon = TOL
            );
        }
        // Both copies face east at their connected end and west at their far end.
        let names: Vec<_> = cell.port_names().map(|n| n.to_string()).collect();
        assert_eq!(names, ["o1", "o2", "o3", "o4"]);
        assert_abs_diff_eq!(cell.port("o1").unwrap().center(), Point::new(-3., 0.), epsilon = TOL);
        assert_abs_diff_eq!(cell.port("o2").unwrap().center(), Point::new(-3., 5.), epsilon = TOL);
        assert_abs_diff_eq!(cell.port("o3").unwrap().center(), Point::new(0., 0.), epsilon = TOL);
        assert_abs_diff_eq!(cell.port("o4").unwrap().center(), Point::new(0., 5.), epsilon = TOL);

        let again = extend_ports_list(&ctx, &ports, &ext, "o1").unwrap();
        assert!(Arc::ptr_eq(&cell, &again));
    }

    #[crate::test]
    fn incompatible_extension_fails() {
        let ctx = test_context();
        let ports = [Port::new("a", (0., 0.), 0., 2.)];
        let ext = Spec::factory(STRAIGHT, Params::new());
        let err = extend_ports_list(&ctx, &ports, &ext, "o1").unwrap_err();
        assert!(matches!(err, Error::IncompatiblePorts { .. }));
        // Only the straight was cached.
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.build_count(EXTEND_BUILDER), 1);
    }
}
