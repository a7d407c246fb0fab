//! Sub-command dispatch as a grammar node.
//!
//! A [`ChildCommandExecutor`] sits at the end of a parent's grammar. While
//! parsing it consumes one token as a sub-command alias and parses that
//! child's grammar into the parent's context; when executed it runs exactly
//! the child (or the parent's fallback) that parsing recorded.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::trace;

use super::context::CommandContext;
use super::cursor::CommandArgs;
use super::element::CommandElement;
use super::value::ArgValue;
use crate::command::{CommandCallable, CommandExecutor, CommandMapping, SimpleDispatcher};
use crate::error::{CommandError, ParseResult, Result};
use crate::source::CommandSource;

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// Grammar node and executor for a command's sub-commands.
pub struct ChildCommandExecutor {
    key: String,
    dispatcher: SimpleDispatcher,
    fallback_executor: Option<Arc<dyn CommandExecutor>>,
    fallback_elements: Option<CommandElement>,
    fallback_on_fail: bool,
}

impl ChildCommandExecutor {
    /// Creates a node with no children.
    ///
    /// `fallback_elements` and `fallback_executor` describe the parent
    /// command itself, used when no child alias matches. With
    /// `fallback_on_fail`, a child whose arguments fail to parse also falls
    /// back instead of reporting the child's error.
    pub fn new(
        fallback_executor: Option<Arc<dyn CommandExecutor>>,
        fallback_elements: Option<CommandElement>,
        fallback_on_fail: bool,
    ) -> Self {
        Self {
            key: format!("child{}", NEXT_ID.fetch_add(1, Ordering::Relaxed)),
            dispatcher: SimpleDispatcher::new(),
            fallback_executor,
            fallback_elements: fallback_elements.filter(|elements| !matches!(elements, CommandElement::None)),
            fallback_on_fail,
        }
    }

    pub fn register<S: AsRef<str>>(
        &self,
        callable: Arc<dyn CommandCallable>,
        aliases: &[S],
    ) -> Option<Arc<CommandMapping>> {
        self.dispatcher.register(callable, aliases)
    }

    /// The context key the chosen child is recorded under.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn has_fallback_executor(&self) -> bool {
        self.fallback_executor.is_some()
    }

    fn args_key(&self) -> String {
        format!("{}_args", self.key)
    }

    fn parse_fallback(
        &self,
        source: &dyn CommandSource,
        args: &mut CommandArgs,
        context: &mut CommandContext,
    ) -> ParseResult<()> {
        if let Some(elements) = &self.fallback_elements {
            elements.parse(source, args, context)?;
        }
        context.put_arg(self.key.as_str(), ArgValue::Fallback);
        Ok(())
    }

    pub(crate) fn parse(
        &self,
        source: &dyn CommandSource,
        args: &mut CommandArgs,
        context: &mut CommandContext,
    ) -> ParseResult<()> {
        if self.fallback_executor.is_some() && !args.has_next() {
            trace!(node = %self.key, "no sub-command given, using fallback");
            return self.parse_fallback(source, args, context);
        }

        let state = args.snapshot();
        let context_state = context.snapshot();
        let alias = args.next()?;

        let Some(mapping) = self.dispatcher.resolve(&alias, source) else {
            if self.fallback_executor.is_some() && self.fallback_elements.is_some() {
                trace!(node = %self.key, alias = %alias, "not a sub-command, using fallback");
                args.apply_snapshot(&state, true);
                return self.parse_fallback(source, args, context);
            }
            return Err(args.create_error(format!("Input command {alias} was not a valid subcommand!")));
        };

        let parsed = match mapping.callable().as_spec() {
            Some(spec) => spec.populate_context(source, args, context),
            None => {
                if args.has_next() {
                    args.next()?;
                    let rest = args.raw()[args.raw_position()..].to_string();
                    context.put_arg(self.args_key(), rest);
                }
                while args.next_if_present().is_some() {}
                Ok(())
            }
        };

        match parsed {
            Ok(()) => {
                trace!(node = %self.key, child = mapping.primary_alias(), "matched sub-command");
                context.put_arg(self.key.as_str(), ArgValue::Mapping(mapping));
                Ok(())
            }
            Err(err) => {
                args.apply_snapshot(&state, true);
                context.apply_snapshot(&context_state);
                if self.fallback_on_fail && self.fallback_elements.is_some() {
                    trace!(node = %self.key, alias = %alias, error = %err, "sub-command failed to parse, using fallback");
                    return self.parse_fallback(source, args, context);
                }
                let usage = match err.usage() {
                    Some(usage) => format!("{alias} {usage}"),
                    None => format!("{alias} {}", mapping.callable().usage(source)),
                };
                Err(err.with_usage(usage))
            }
        }
    }

    /// Child aliases the source may use, then the fallback grammar.
    pub(crate) fn element_usage(&self, source: &dyn CommandSource) -> String {
        let usage = self.dispatcher.usage(source);
        match &self.fallback_elements {
            Some(elements) => {
                let fallback = elements.usage(source);
                if fallback.is_empty() { usage } else { format!("{usage}|{fallback}") }
            }
            None => usage,
        }
    }
}

#[async_trait]
impl CommandExecutor for ChildCommandExecutor {
    async fn execute(&self, source: &dyn CommandSource, context: &CommandContext) -> Result<()> {
        if let Some(ArgValue::Mapping(mapping)) = context.get_one::<ArgValue>(&self.key) {
            return match mapping.callable().as_spec() {
                Some(spec) => {
                    spec.check_permission(source)?;
                    spec.executor().execute(source, context).await
                }
                None => {
                    let arguments = context.get_one::<String>(&self.args_key()).unwrap_or_default();
                    mapping.callable().process(source, &arguments).await
                }
            };
        }

        match &self.fallback_executor {
            Some(executor) => executor.execute(source, context).await,
            None => Err(CommandError::generic(format!(
                "Invalid subcommand state: no mapping recorded for child argument {}",
                self.key
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::args::{integer, optional, remaining_joined_strings, seq, string};
    use crate::command::{CommandSpec, executor_fn};
    use crate::testing::TestSource;

    type Log = Arc<Mutex<Vec<String>>>;

    /// An executor that records `label` and the integer arguments it saw.
    fn logging(label: &'static str, log: &Log) -> impl CommandExecutor + 'static {
        let log = Arc::clone(log);
        executor_fn(move |_, context| {
            let log = Arc::clone(&log);
            Box::pin(async move {
                let mut entry = label.to_string();
                for key in ["a", "b", "n"] {
                    if let Some(value) = context.get_one::<i32>(key) {
                        entry.push_str(&format!(" {key}={value}"));
                    }
                }
                if let Some(text) = context.get_one::<String>("text") {
                    entry.push_str(&format!(" text={text}"));
                }
                log.lock().unwrap().push(entry);
                Ok(())
            })
        })
    }

    fn sub(log: &Log) -> Arc<dyn CommandCallable> {
        Arc::new(
            CommandSpec::builder()
                .arguments(seq(vec![integer("a"), integer("b")]))
                .executor(logging("sub", log))
                .build()
                .unwrap(),
        )
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_parent_fallback_and_child() {
        let log = Log::default();
        let parent = CommandSpec::builder()
            .executor(logging("parent", &log))
            .child(sub(&log), &["sub"])
            .build()
            .unwrap();
        let source = TestSource::new();

        parent.process(&source, "").await.unwrap();
        parent.process(&source, "sub 1 2").await.unwrap();
        assert_eq!(entries(&log), vec!["parent", "sub a=1 b=2"]);
    }

    #[tokio::test]
    async fn test_unknown_child_without_fallback_grammar() {
        let log = Log::default();
        let parent = CommandSpec::builder().child(sub(&log), &["sub"]).build().unwrap();
        let err = parent.process(&TestSource::new(), "bogus").await.unwrap_err();
        match err {
            CommandError::ArgumentParse(err) => {
                assert_eq!(err.message(), "Input command bogus was not a valid subcommand!");
                assert_eq!(err.position(), 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(entries(&log).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_child_parses_fallback_grammar() {
        let log = Log::default();
        let parent = CommandSpec::builder()
            .arguments(optional(remaining_joined_strings("text")))
            .executor(logging("parent", &log))
            .child(sub(&log), &["sub"])
            .build()
            .unwrap();
        parent.process(&TestSource::new(), "hello there").await.unwrap();
        assert_eq!(entries(&log), vec!["parent text=hello there"]);
    }

    #[tokio::test]
    async fn test_child_failure_falls_back_when_enabled() {
        let log = Log::default();
        let parent = CommandSpec::builder()
            .arguments(remaining_joined_strings("text"))
            .executor(logging("parent", &log))
            .child(sub(&log), &["sub"])
            .build()
            .unwrap();
        parent.process(&TestSource::new(), "sub 1 x").await.unwrap();
        assert_eq!(entries(&log), vec!["parent text=sub 1 x"]);
    }

    #[tokio::test]
    async fn test_child_failure_reports_path_when_fallback_disabled() {
        let log = Log::default();
        let parent = CommandSpec::builder()
            .arguments(remaining_joined_strings("text"))
            .executor(logging("parent", &log))
            .child(sub(&log), &["sub"])
            .child_argument_parse_fallback(false)
            .build()
            .unwrap();
        let err = parent.process(&TestSource::new(), "sub 1 x").await.unwrap_err();
        assert_eq!(err.to_string(), "Expected an integer, but input 'x' was not");
        assert_eq!(err.usage(), Some("sub <a> <b>"));
        assert!(entries(&log).is_empty());
    }

    #[tokio::test]
    async fn test_nested_errors_accumulate_command_path() {
        let log = Log::default();
        let leaf = CommandSpec::builder().arguments(integer("n")).executor(logging("leaf", &log)).build().unwrap();
        let middle = CommandSpec::builder().child(Arc::new(leaf), &["b"]).build().unwrap();
        let top = CommandSpec::builder().child(Arc::new(middle), &["a"]).build().unwrap();

        let err = top.process(&TestSource::new(), "a b nope").await.unwrap_err();
        assert_eq!(err.usage(), Some("a b <n>"));
        match err {
            CommandError::ArgumentParse(err) => assert_eq!(err.position(), 4),
            other => panic!("unexpected error: {other:?}"),
        }

        top.process(&TestSource::new(), "a b 7").await.unwrap();
        assert_eq!(entries(&log), vec!["leaf n=7"]);
    }

    #[tokio::test]
    async fn test_forbidden_child_is_a_miss() {
        let log = Log::default();
        let secret = CommandSpec::builder().permission("kvk.secret").executor(logging("secret", &log)).build().unwrap();
        let parent = CommandSpec::builder()
            .arguments(optional(string("word")))
            .executor(logging("parent", &log))
            .child(Arc::new(secret), &["secret"])
            .build()
            .unwrap();

        parent.process(&TestSource::new(), "secret").await.unwrap();
        parent.process(&TestSource::with_permissions(&["kvk.secret"]), "secret").await.unwrap();
        assert_eq!(entries(&log), vec!["parent", "secret"]);
    }

    #[tokio::test]
    async fn test_non_spec_child_receives_raw_remainder() {
        let log = Log::default();
        let echo = CommandSpec::builder()
            .arguments(remaining_joined_strings("text"))
            .executor(logging("echo", &log))
            .build()
            .unwrap();
        let nested = SimpleDispatcher::new();
        nested.register(Arc::new(echo), &["echo"]);

        let parent = CommandSpec::builder().child(Arc::new(nested), &["net"]).build().unwrap();
        parent.process(&TestSource::new(), "net echo \"a  b\" c").await.unwrap();
        assert_eq!(entries(&log), vec!["echo text=\"a  b\" c"]);
    }

    #[tokio::test]
    async fn test_execute_without_recorded_state() {
        let node = ChildCommandExecutor::new(None, None, false);
        let err = node.execute(&TestSource::new(), &CommandContext::new()).await.unwrap_err();
        assert!(err.to_string().starts_with("Invalid subcommand state"));
    }

    #[test]
    fn test_usage_lists_children_then_fallback() {
        let log = Log::default();
        let parent = CommandSpec::builder()
            .arguments(optional(string("word")))
            .executor(logging("parent", &log))
            .child(sub(&log), &["sub", "s"])
            .build()
            .unwrap();
        assert_eq!(parent.usage(&TestSource::new()), "sub|[<word>]");

        let bare = CommandSpec::builder().child(sub(&log), &["sub"]).build().unwrap();
        assert_eq!(bare.usage(&TestSource::new()), "sub");
    }

    #[test]
    fn test_none_fallback_is_ignored() {
        let node = ChildCommandExecutor::new(None, Some(CommandElement::None), true);
        assert!(node.fallback_elements.is_none());
        assert!(node.key().starts_with("child"));
    }
}
