//! Daisy-chaining cells from a symbol string.
//!
//! Each character of a sequence names an entry of a [`SymbolTable`]: a cell
//! together with the port that connects to the previous element and the port
//! the next element connects to. The first element is placed at the origin;
//! every following element is mated to the output of the one before it.

use std::collections::BTreeMap;
use std::sync::Arc;

use arcstr::ArcStr;
use geometry::prelude::*;

use crate::cell::{Cell, CellBuilder, COMPONENT_COUNT, PARENT_NAME};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::params::{Params, Spec};
use crate::port::Port;

/// The builder identifier under which sequences are cached.
pub const SEQUENCE_BUILDER: &str = "component_sequence";

/// Prefix of the sequence input port before renaming.
const INPUT_PREFIX: &str = "in_";
/// Prefix of the sequence output port before renaming.
const OUTPUT_PREFIX: &str = "out_";

/// A cell and the ports through which it is chained.
#[derive(Debug, Clone)]
pub struct SymbolEntry {
    /// The cell to place.
    pub cell: Arc<Cell>,
    /// The port connected to the previous element's output.
    pub input: ArcStr,
    /// The port the next element connects to.
    pub output: ArcStr,
}

/// A map from sequence characters to [`SymbolEntry`]s.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: BTreeMap<char, SymbolEntry>,
}

impl SymbolTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, returning the updated table.
    pub fn with(
        mut self,
        symbol: char,
        cell: Arc<Cell>,
        input: impl Into<ArcStr>,
        output: impl Into<ArcStr>,
    ) -> Self {
        self.insert(symbol, cell, input, output);
        self
    }

    /// Adds an entry, replacing any previous entry for `symbol`.
    pub fn insert(
        &mut self,
        symbol: char,
        cell: Arc<Cell>,
        input: impl Into<ArcStr>,
        output: impl Into<ArcStr>,
    ) {
        self.entries.insert(
            symbol,
            SymbolEntry {
                cell,
                input: input.into(),
                output: output.into(),
            },
        );
    }

    /// Gets the entry for `symbol`.
    pub fn get(&self, symbol: char) -> Option<&SymbolEntry> {
        self.entries.get(&symbol)
    }

    /// Iterates over the entries in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (char, &SymbolEntry)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn params(&self) -> Params {
        self.iter()
            .map(|(symbol, entry)| {
                (
                    ArcStr::from(symbol.to_string()),
                    Params::new()
                        .with("cell", Spec::Direct(entry.cell.clone()))
                        .with("input", entry.input.clone())
                        .with("output", entry.output.clone()),
                )
            })
            .collect()
    }

    /// Checks that every symbol of `sequence` has an entry whose cell has
    /// the entry's ports.
    fn validate(&self, sequence: &str) -> Result<()> {
        if sequence.is_empty() {
            return Err(Error::SequenceConfig(arcstr::literal!("empty sequence")));
        }
        for (index, symbol) in sequence.chars().enumerate() {
            let entry = self
                .get(symbol)
                .ok_or(Error::UnknownSymbol { symbol, index })?;
            for port in [&entry.input, &entry.output] {
                entry
                    .cell
                    .port(port)
                    .map_err(|err| err.at_symbol(symbol, index))?;
            }
        }
        Ok(())
    }
}

/// Chains the cells named by `sequence` into one composite cell.
///
/// The result exposes the first element's input and the last element's
/// output, plus every other port of every element (unconnected side ports),
/// all renamed with [`auto_rename_ports`](crate::rename::auto_rename_ports).
/// Its metadata records the number of placed elements under
/// [`COMPONENT_COUNT`] and `"{first parent name}_{count}"` under
/// [`PARENT_NAME`].
///
/// The sequence and table are validated before anything is placed. The
/// result is cached by the context.
pub fn build_sequence(ctx: &Context, sequence: &str, table: &SymbolTable) -> Result<Arc<Cell>> {
    table.validate(sequence)?;
    let params = Params::new()
        .with("sequence", sequence)
        .with("symbols", table.params());
    ctx.generate(SEQUENCE_BUILDER, params, |_, cell| {
        place_sequence(cell, sequence, table)
    })
}

fn place_sequence(cell: &mut CellBuilder, sequence: &str, table: &SymbolTable) -> Result<()> {
    let mut output: Option<Port> = None;
    let mut parent_name = None;
    let mut count = 0usize;

    for (index, symbol) in sequence.chars().enumerate() {
        let entry = table
            .get(symbol)
            .ok_or(Error::UnknownSymbol { symbol, index })?;
        let at_symbol = |err: Error| err.at_symbol(symbol, index);

        let id = match output.as_ref() {
            None => {
                parent_name = Some(entry.cell.parent_name());
                let id = cell.place(entry.cell.clone(), Transformation::identity());
                let input = cell.instance(id)?.port(&entry.input).map_err(at_symbol)?;
                cell.add_ports([input], Some(INPUT_PREFIX))?;
                id
            }
            Some(anchor) => cell
                .connect(entry.cell.clone(), &entry.input, anchor)
                .map_err(at_symbol)?,
        };
        cell.merge_ports(
            id,
            &[entry.input.as_str(), entry.output.as_str()],
            Some(format!("{index}_").as_str()),
        )?;
        output = Some(cell.instance(id)?.port(&entry.output).map_err(at_symbol)?);
        count += 1;
        tracing::trace!(%symbol, index, "placed sequence element");
    }

    if let Some(output) = output {
        cell.add_ports([output], Some(OUTPUT_PREFIX))?;
    }
    cell.set_info(COMPONENT_COUNT, count);
    if let Some(parent_name) = parent_name {
        cell.set_info(PARENT_NAME, arcstr::format!("{parent_name}_{count}"));
    }
    cell.auto_rename_ports();
    Ok(())
}
