use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::dom::{Dom, NodeId};
use crate::selection::{Point, Selection, SelectionTracker, ensure_text_point};

pub mod block;
pub mod edit;
pub mod inline;
pub mod list;
pub mod normalize;

pub use inline::Format;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct QueryError {
    message: String,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Formats armed at a collapsed caret, applied to the next typed text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingFormats {
    at: Option<Point>,
    overrides: Vec<(Format, bool)>,
}

impl PendingFormats {
    pub fn get(&self, at: Point, format: Format) -> Option<bool> {
        if self.at != Some(at) {
            return None;
        }
        self.overrides
            .iter()
            .find(|(f, _)| *f == format)
            .map(|&(_, on)| on)
    }

    pub fn set(&mut self, at: Point, format: Format, on: bool) {
        if self.at != Some(at) {
            self.at = Some(at);
            self.overrides.clear();
        }
        self.overrides.retain(|(f, _)| *f != format);
        self.overrides.push((format, on));
    }

    /// Drains the overrides armed at `at`; stale ones are discarded.
    pub fn take(&mut self, at: Point) -> Vec<(Format, bool)> {
        let matches = self.at == Some(at);
        self.at = None;
        let overrides = std::mem::take(&mut self.overrides);
        if matches { overrides } else { Vec::new() }
    }

    pub fn clear(&mut self) {
        self.at = None;
        self.overrides.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

/// Working state handed to a command handler. `start` and `end` are text
/// points in document order.
pub struct CommandContext<'a> {
    pub dom: &'a mut Dom,
    pub start: Point,
    pub end: Point,
    pub pending: &'a mut PendingFormats,
}

impl CommandContext<'_> {
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// What a handler did. Without an explicit selection the pre-command
/// selection is restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandOutcome {
    pub selection: Option<Selection>,
    pub mutated: bool,
}

impl CommandOutcome {
    pub fn mutated() -> Self {
        Self {
            selection: None,
            mutated: true,
        }
    }

    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn select(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn caret(self, point: Point) -> Self {
        self.select(Selection::collapsed(point))
    }
}

pub struct QueryContext<'a> {
    pub dom: &'a Dom,
    /// Node describing the selection start.
    pub node: NodeId,
    /// Set when the selection is a caret.
    pub caret: Option<Point>,
    /// Ordered endpoints when the selection is a range.
    pub range: Option<(Point, Point)>,
    pub pending: &'a PendingFormats,
}

type CommandHandler = Arc<
    dyn Fn(&mut CommandContext<'_>, Option<&str>) -> Result<CommandOutcome, CommandError>
        + Send
        + Sync,
>;

type QueryHandler =
    Arc<dyn Fn(&QueryContext<'_>, Option<&str>) -> Result<Value, QueryError> + Send + Sync>;

#[derive(Clone)]
pub struct CommandSpec {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub value_example: Option<String>,
    pub hidden: bool,
    pub handler: CommandHandler,
}

impl CommandSpec {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        handler: impl Fn(
            &mut CommandContext<'_>,
            Option<&str>,
        ) -> Result<CommandOutcome, CommandError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            keywords: Vec::new(),
            value_example: None,
            hidden: false,
            handler: Arc::new(handler),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn value_example(mut self, example: impl Into<String>) -> Self {
        self.value_example = Some(example.into());
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

#[derive(Clone)]
pub struct QuerySpec {
    pub id: String,
    pub handler: QueryHandler,
}

impl QuerySpec {
    pub fn new(
        id: impl Into<String>,
        handler: impl Fn(&QueryContext<'_>, Option<&str>) -> Result<Value, QueryError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
        }
    }

    /// Query answering with a boolean state.
    pub fn state(
        id: impl Into<String>,
        handler: impl Fn(&QueryContext<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(id, move |ctx, _value| Ok(Value::Bool(handler(ctx))))
    }
}

/// Palette entry for a registered command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandInfo {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub value_example: Option<String>,
}

pub trait CommandPlugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn normalize_passes(&self) -> Vec<Box<dyn normalize::NormalizePass>> {
        Vec::new()
    }
    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }
    fn queries(&self) -> Vec<QuerySpec> {
        Vec::new()
    }
}

/// Command and query tables keyed case-insensitively, the way
/// `execCommand` names are matched.
#[derive(Default)]
pub struct CommandRegistry {
    normalize_passes: Vec<Box<dyn normalize::NormalizePass>>,
    commands: HashMap<String, CommandSpec>,
    queries: HashMap<String, QuerySpec>,
}

impl CommandRegistry {
    pub fn new(plugins: impl IntoIterator<Item = Box<dyn CommandPlugin>>) -> Result<Self, String> {
        let mut registry = Self::default();
        for plugin in plugins {
            registry.register_plugin(plugin)?;
        }
        Ok(registry)
    }

    pub fn richtext() -> Self {
        let plugins: Vec<Box<dyn CommandPlugin>> = vec![
            Box::new(normalize::NormalizePlugin),
            Box::new(inline::InlineFormatPlugin),
            Box::new(inline::ColorPlugin),
            Box::new(inline::LinkPlugin),
            Box::new(block::AlignPlugin),
            Box::new(block::IndentPlugin),
            Box::new(block::BlockFormatPlugin),
            Box::new(list::ListPlugin),
            Box::new(edit::EditingPlugin),
        ];
        let mut registry = Self::default();
        for plugin in plugins {
            let id = plugin.id();
            if let Err(err) = registry.register_plugin(plugin) {
                tracing::error!(plugin = id, %err, "skipping command plugin");
            }
        }
        registry
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn CommandPlugin>) -> Result<(), String> {
        self.normalize_passes.extend(plugin.normalize_passes());

        for cmd in plugin.commands() {
            let key = cmd.id.to_ascii_lowercase();
            if self.commands.contains_key(&key) {
                return Err(format!("Duplicate command id: {}", cmd.id));
            }
            self.commands.insert(key, cmd);
        }

        for query in plugin.queries() {
            let key = query.id.to_ascii_lowercase();
            if self.queries.contains_key(&key) {
                return Err(format!("Duplicate query id: {}", query.id));
            }
            self.queries.insert(key, query);
        }

        Ok(())
    }

    pub fn command(&self, id: &str) -> Option<CommandSpec> {
        self.commands.get(&id.to_ascii_lowercase()).cloned()
    }

    pub fn query(&self, id: &str) -> Option<QuerySpec> {
        self.queries.get(&id.to_ascii_lowercase()).cloned()
    }

    pub fn has_command(&self, id: &str) -> bool {
        self.commands.contains_key(&id.to_ascii_lowercase())
    }

    /// Visible commands sorted by id.
    pub fn command_infos(&self) -> Vec<CommandInfo> {
        let mut infos: Vec<CommandInfo> = self
            .commands
            .values()
            .filter(|spec| !spec.hidden)
            .map(|spec| CommandInfo {
                id: spec.id.clone(),
                label: spec.label.clone(),
                description: spec.description.clone(),
                keywords: spec.keywords.clone(),
                value_example: spec.value_example.clone(),
            })
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    pub fn normalize(&self, dom: &mut Dom, keep: &[NodeId]) {
        for pass in &self.normalize_passes {
            pass.run(dom, keep);
        }
    }
}

/// Runs commands against a document with selection preservation: the
/// selection is captured before the handler, restored (or replaced by the
/// handler's choice) afterwards, and a failing handler leaves the document
/// exactly as it was.
pub struct CommandExecutor {
    registry: CommandRegistry,
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new(CommandRegistry::richtext())
    }
}

impl CommandExecutor {
    pub fn new(registry: CommandRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn execute(
        &self,
        dom: &mut Dom,
        tracker: &mut SelectionTracker,
        pending: &mut PendingFormats,
        name: &str,
        value: Option<&str>,
    ) -> Result<CommandOutcome, CommandError> {
        let spec = self
            .registry
            .command(name)
            .ok_or_else(|| CommandError::new(format!("Unknown command: {name}")))?;

        let anchor = tracker.capture(dom);
        let snapshot = dom.clone();
        let selection = match tracker.selection() {
            Some(selection) => selection,
            None => Selection::collapsed(crate::selection::document_end(dom)),
        };
        let (start, end) = selection.ordered(dom);
        let start = ensure_text_point(dom, start);
        let end = if selection.is_collapsed() {
            start
        } else {
            ensure_text_point(dom, end)
        };

        let mut ctx = CommandContext {
            dom,
            start,
            end,
            pending,
        };
        match (spec.handler)(&mut ctx, value) {
            Ok(outcome) => {
                match outcome.selection {
                    Some(selection) => tracker.set(Some(selection)),
                    None => {
                        tracker.restore(dom, anchor.as_ref());
                    }
                }
                let keep: Vec<NodeId> = tracker
                    .selection()
                    .map(|s| vec![s.anchor.node, s.focus.node])
                    .unwrap_or_default();
                self.registry.normalize(dom, &keep);
                tracker.revalidate(dom);
                tracing::trace!(command = %spec.id, mutated = outcome.mutated, "command applied");
                Ok(outcome)
            }
            Err(err) => {
                dom.restore_from(snapshot);
                tracker.restore(dom, anchor.as_ref());
                tracing::warn!(
                    command = %spec.id,
                    error = %err,
                    "command failed; document rolled back"
                );
                Err(err)
            }
        }
    }

    pub fn query(
        &self,
        dom: &Dom,
        selection: Option<Selection>,
        pending: &PendingFormats,
        name: &str,
        value: Option<&str>,
    ) -> Result<Value, QueryError> {
        let spec = self
            .registry
            .query(name)
            .ok_or_else(|| QueryError::new(format!("Unknown query: {name}")))?;
        let selection = selection
            .unwrap_or_else(|| Selection::collapsed(crate::selection::document_end(dom)));
        let (start, end) = selection.ordered(dom);
        let collapsed = selection.is_collapsed();
        let ctx = QueryContext {
            dom,
            node: crate::selection::context_node(dom, start),
            caret: collapsed.then_some(start),
            range: (!collapsed).then_some((start, end)),
            pending,
        };
        (spec.handler)(&ctx, value)
    }

    /// Boolean command state; commands without a state report `false`.
    pub fn query_state(
        &self,
        dom: &Dom,
        selection: Option<Selection>,
        pending: &PendingFormats,
        name: &str,
    ) -> bool {
        if self.registry.query(name).is_none() {
            return false;
        }
        match self.query(dom, selection, pending, name, None) {
            Ok(value) => value.as_bool().unwrap_or(false),
            Err(err) => {
                tracing::debug!(query = name, error = %err, "state query failed");
                false
            }
        }
    }
}
