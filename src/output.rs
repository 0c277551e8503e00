//! Output formatting for compiled queries and graph views

use crate::apply::LayoutOutcome;
use crate::graph::{ElementKind, GraphHandle, MemoryGraph};
use crate::query::CompiledQuery;
use crate::session::{DisplayOptions, Session, Slot};
use serde::Serialize;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

fn stdout(color: bool) -> StandardStream {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

/// How an element is currently shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementState {
    Visible,
    Hidden,
    Removed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ElementView {
    pub id: String,
    pub kind: ElementKind,
    pub state: ElementState,
    /// Highlighted by find. Hidden and removed elements are never highlighted.
    pub matched: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    pub value: String,
    pub selector: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphView {
    pub find: SlotView,
    pub hide: SlotView,
    pub compress_on_hide: bool,
    pub layout: Option<LayoutOutcome>,
    pub display: DisplayOptions,
    pub elements: Vec<ElementView>,
}

impl GraphView {
    pub fn build(graph: &MemoryGraph, session: &Session) -> Self {
        let marked = graph.marked();
        let elements = graph
            .all()
            .iter()
            .filter_map(|id| {
                let state = if !graph.is_present(id) {
                    ElementState::Removed
                } else if graph.is_visible(id) {
                    ElementState::Visible
                } else {
                    ElementState::Hidden
                };
                Some(ElementView {
                    id: graph.label(id)?.to_string(),
                    kind: graph.kind(id)?,
                    state,
                    matched: state == ElementState::Visible && marked.contains(id),
                })
            })
            .collect();

        Self {
            find: slot_view(session, Slot::Find),
            hide: slot_view(session, Slot::Hide),
            compress_on_hide: session.compress_on_hide(),
            layout: session.hide_state().map(|s| s.layout),
            display: session.display_options().clone(),
            elements,
        }
    }

    pub fn count(&self, state: ElementState) -> usize {
        self.elements.iter().filter(|e| e.state == state).count()
    }
}

fn slot_view(session: &Session, slot: Slot) -> SlotView {
    SlotView {
        value: session.value(slot).to_string(),
        selector: session.query(slot).map(|q| q.to_string()),
        error: session.error(slot).map(str::to_string),
    }
}

/// Print the compiled form of an expression
pub fn print_query(query: Option<&CompiledQuery>, color: bool) -> io::Result<()> {
    write_query(&mut stdout(color), query)
}

/// Print a graph view as a colored element listing
pub fn print_view(view: &GraphView, color: bool) -> io::Result<()> {
    write_view(&mut stdout(color), view)
}

/// Print a graph view as pretty JSON
pub fn print_view_json(view: &GraphView) -> io::Result<()> {
    let json = serde_json::to_string_pretty(view).map_err(io::Error::other)?;
    let mut out = io::stdout().lock();
    writeln!(out, "{json}")
}

/// Print operand names, one per line
pub fn print_operands<'a>(operands: impl IntoIterator<Item = &'a str>) -> io::Result<()> {
    let mut out = io::stdout().lock();
    for operand in operands {
        writeln!(out, "{operand}")?;
    }
    Ok(())
}

fn write_label<W: WriteColor>(out: &mut W, label: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
    write!(out, "{label:<12}")?;
    out.reset()
}

pub(crate) fn write_query<W: WriteColor>(out: &mut W, query: Option<&CompiledQuery>) -> io::Result<()> {
    let Some(query) = query else {
        writeln!(out, "(empty expression)")?;
        return Ok(());
    };

    write_label(out, "expression")?;
    writeln!(out, "{}", query.expression)?;
    write_label(out, "selector")?;
    writeln!(out, "{query}")?;
    write_label(out, "target")?;
    writeln!(out, "{}", query.target)?;
    write_label(out, "connective")?;
    match query.connective {
        Some(c) => writeln!(out, "{c}")?,
        None => writeln!(out, "-")?,
    }
    for request in &query.requests {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
        writeln!(out, "{}", request.message())?;
        out.reset()?;
    }
    Ok(())
}

pub(crate) fn write_view<W: WriteColor>(out: &mut W, view: &GraphView) -> io::Result<()> {
    for (name, slot) in [("find", &view.find), ("hide", &view.hide)] {
        if let Some(error) = &slot.error {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
            writeln!(out, "{error}")?;
            out.reset()?;
        } else if let Some(selector) = &slot.selector {
            write_label(out, name)?;
            writeln!(out, "{selector}")?;
        }
    }

    for element in &view.elements {
        let kind = match element.kind {
            ElementKind::Node => "node",
            ElementKind::Edge => "edge",
        };
        match element.state {
            ElementState::Visible if element.matched => {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
                write!(out, "* {kind} {}", element.id)?;
            }
            ElementState::Visible => write!(out, "  {kind} {}", element.id)?,
            ElementState::Hidden => {
                out.set_color(ColorSpec::new().set_dimmed(true))?;
                write!(out, "  {kind} {} (hidden)", element.id)?;
            }
            ElementState::Removed => {
                out.set_color(ColorSpec::new().set_dimmed(true))?;
                write!(out, "  {kind} {} (removed)", element.id)?;
            }
        }
        out.reset()?;
        writeln!(out)?;
    }

    writeln!(
        out,
        "{} visible, {} hidden, {} removed",
        view.count(ElementState::Visible),
        view.count(ElementState::Hidden),
        view.count(ElementState::Removed)
    )
}
