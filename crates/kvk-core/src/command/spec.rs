//! Grammar-backed commands.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::trace;

use super::CommandCallable;
use crate::args::{ChildCommandExecutor, CommandArgs, CommandContext, CommandElement, InputTokenizer, quoted_strings};
use crate::error::{CommandError, ParseResult, Result, SpecError};
use crate::source::CommandSource;

/// Future returned by closure executors.
pub type ExecutorFuture<'a> = BoxFuture<'a, Result<()>>;

/// Runs a command once its arguments have been parsed.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, source: &dyn CommandSource, context: &CommandContext) -> Result<()>;
}

/// Adapter turning a closure into a [`CommandExecutor`].
pub struct ExecutorFn<F>(F);

/// Wraps an async closure as an executor.
///
/// ```
/// use kvk_core::command::executor_fn;
///
/// let echo = executor_fn(|source, context| {
///     Box::pin(async move {
///         for word in context.get_all::<String>("message") {
///             source.send_message(&word);
///         }
///         Ok(())
///     })
/// });
/// # let _ = echo;
/// ```
pub fn executor_fn<F>(f: F) -> ExecutorFn<F>
where
    F: for<'a> Fn(&'a dyn CommandSource, &'a CommandContext) -> ExecutorFuture<'a> + Send + Sync,
{
    ExecutorFn(f)
}

#[async_trait]
impl<F> CommandExecutor for ExecutorFn<F>
where
    F: for<'a> Fn(&'a dyn CommandSource, &'a CommandContext) -> ExecutorFuture<'a> + Send + Sync,
{
    async fn execute(&self, source: &dyn CommandSource, context: &CommandContext) -> Result<()> {
        (self.0)(source, context).await
    }
}

/// A command defined by an argument grammar and an executor.
pub struct CommandSpec {
    args: CommandElement,
    executor: Arc<dyn CommandExecutor>,
    description: Option<String>,
    extended_description: Option<String>,
    permission: Option<String>,
    input_tokenizer: Arc<dyn InputTokenizer>,
}

impl CommandSpec {
    pub fn builder() -> CommandSpecBuilder {
        CommandSpecBuilder::new()
    }

    /// Fails with a permission error unless `source` may run this command.
    pub fn check_permission(&self, source: &dyn CommandSource) -> Result<()> {
        if self.test_permission(source) { Ok(()) } else { Err(CommandError::Permission) }
    }

    /// Parses `args` into `context` and rejects leftover tokens.
    pub fn populate_context(
        &self,
        source: &dyn CommandSource,
        args: &mut CommandArgs,
        context: &mut CommandContext,
    ) -> ParseResult<()> {
        self.args.parse(source, args, context)?;
        if args.has_next() {
            args.next()?;
            return Err(args.create_error("Too many arguments!"));
        }
        Ok(())
    }

    pub fn arguments(&self) -> &CommandElement {
        &self.args
    }

    pub fn executor(&self) -> &Arc<dyn CommandExecutor> {
        &self.executor
    }

    pub fn permission(&self) -> Option<&str> {
        self.permission.as_deref()
    }

    pub fn extended_description(&self) -> Option<&str> {
        self.extended_description.as_deref()
    }

    pub fn input_tokenizer(&self) -> &Arc<dyn InputTokenizer> {
        &self.input_tokenizer
    }
}

#[async_trait]
impl CommandCallable for CommandSpec {
    async fn process(&self, source: &dyn CommandSource, arguments: &str) -> Result<()> {
        self.check_permission(source)?;

        let tokens = self.input_tokenizer.tokenize(arguments, false)?;
        let mut args = CommandArgs::new(arguments, tokens);
        let mut context = CommandContext::new();
        self.populate_context(source, &mut args, &mut context)?;

        trace!(source = source.name(), keys = ?context.keys().collect::<Vec<_>>(), "executing command");
        self.executor.execute(source, &context).await
    }

    fn test_permission(&self, source: &dyn CommandSource) -> bool {
        self.permission.as_deref().is_none_or(|permission| source.has_permission(permission))
    }

    fn short_description(&self, _source: &dyn CommandSource) -> Option<String> {
        self.description.clone()
    }

    fn usage(&self, source: &dyn CommandSource) -> String {
        self.args.usage(source)
    }

    fn help(&self, source: &dyn CommandSource) -> Option<String> {
        let usage = self.usage(source);
        let lines: Vec<&str> = [self.description.as_deref(), Some(usage.as_str()), self.extended_description.as_deref()]
            .into_iter()
            .flatten()
            .filter(|line| !line.is_empty())
            .collect();
        Some(lines.join("\n"))
    }

    fn as_spec(&self) -> Option<&CommandSpec> {
        Some(self)
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("args", &self.args)
            .field("description", &self.description)
            .field("extended_description", &self.extended_description)
            .field("permission", &self.permission)
            .field("input_tokenizer", &self.input_tokenizer)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CommandSpec`].
pub struct CommandSpecBuilder {
    args: Option<CommandElement>,
    description: Option<String>,
    extended_description: Option<String>,
    permission: Option<String>,
    executor: Option<Arc<dyn CommandExecutor>>,
    children: Vec<(Vec<String>, Arc<dyn CommandCallable>)>,
    child_fallback: bool,
    input_tokenizer: Arc<dyn InputTokenizer>,
}

impl CommandSpecBuilder {
    pub fn new() -> Self {
        Self {
            args: None,
            description: None,
            extended_description: None,
            permission: None,
            executor: None,
            children: Vec::new(),
            child_fallback: true,
            input_tokenizer: quoted_strings(false),
        }
    }

    #[must_use]
    pub fn arguments(mut self, args: CommandElement) -> Self {
        self.args = Some(args);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn extended_description(mut self, extended_description: impl Into<String>) -> Self {
        self.extended_description = Some(extended_description.into());
        self
    }

    #[must_use]
    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    #[must_use]
    pub fn executor(mut self, executor: impl CommandExecutor + 'static) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    /// Registers a sub-command under `aliases`.
    #[must_use]
    pub fn child(mut self, callable: Arc<dyn CommandCallable>, aliases: &[&str]) -> Self {
        self.children.push((aliases.iter().map(ToString::to_string).collect(), callable));
        self
    }

    /// Whether a sub-command whose arguments fail to parse falls back to
    /// this command's own arguments. Defaults to `true`.
    #[must_use]
    pub fn child_argument_parse_fallback(mut self, fallback: bool) -> Self {
        self.child_fallback = fallback;
        self
    }

    #[must_use]
    pub fn input_tokenizer(mut self, tokenizer: Arc<dyn InputTokenizer>) -> Self {
        self.input_tokenizer = tokenizer;
        self
    }

    /// Assembles the command.
    ///
    /// With children and no executor, the declared arguments are followed
    /// by a sub-command node that also serves as the executor. With both,
    /// the declared arguments and executor become that node's fallback.
    pub fn build(self) -> std::result::Result<CommandSpec, SpecError> {
        let (args, executor) = if self.children.is_empty() {
            let executor = self.executor.ok_or(SpecError::MissingExecutor)?;
            (self.args.unwrap_or(CommandElement::None), executor)
        } else {
            let node = match self.executor {
                Some(executor) => ChildCommandExecutor::new(Some(executor), self.args.clone(), self.child_fallback),
                None => ChildCommandExecutor::new(None, None, false),
            };
            for (aliases, callable) in self.children {
                node.register(callable, &aliases);
            }
            let node = Arc::new(node);
            let child = CommandElement::Child(Arc::clone(&node));
            let args = match (node.has_fallback_executor(), self.args) {
                (false, Some(args)) => CommandElement::Sequence(vec![args, child]),
                _ => child,
            };
            (args, node as Arc<dyn CommandExecutor>)
        };

        Ok(CommandSpec {
            args,
            executor,
            description: self.description,
            extended_description: self.extended_description,
            permission: self.permission,
            input_tokenizer: self.input_tokenizer,
        })
    }
}

impl Default for CommandSpecBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::args::{integer, optional, string};
    use crate::testing::TestSource;

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl CommandExecutor for Counting {
        async fn execute(&self, _source: &dyn CommandSource, _context: &CommandContext) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn counted(args: CommandElement) -> (CommandSpec, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let spec = CommandSpec::builder().arguments(args).executor(Counting(Arc::clone(&calls))).build().unwrap();
        (spec, calls)
    }

    #[tokio::test]
    async fn test_process_runs_executor() {
        let (spec, calls) = counted(integer("n"));
        spec.process(&TestSource::new(), "5").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_too_many_arguments_positioned_at_first_leftover() {
        let (spec, calls) = counted(integer("n"));
        let err = spec.process(&TestSource::new(), "5 6").await.unwrap_err();
        match err {
            CommandError::ArgumentParse(err) => {
                assert_eq!(err.message(), "Too many arguments!");
                assert_eq!(err.position(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_permission_checked_first() {
        let calls = Arc::new(AtomicUsize::new(0));
        let spec = CommandSpec::builder()
            .permission("kvk.admin")
            .executor(Counting(Arc::clone(&calls)))
            .build()
            .unwrap();

        let err = spec.process(&TestSource::new(), "").await.unwrap_err();
        assert!(matches!(err, CommandError::Permission));
        assert!(!err.should_include_usage());

        spec.process(&TestSource::with_permissions(&["kvk.admin"]), "").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unterminated_quote_is_parse_error() {
        let (spec, _) = counted(string("s"));
        let err = spec.process(&TestSource::new(), "\"open").await.unwrap_err();
        assert!(err.should_include_usage());
        assert!(err.to_string().contains("Unterminated quoted string"));
    }

    #[tokio::test]
    async fn test_executor_fn_sees_context() {
        let spec = CommandSpec::builder()
            .arguments(string("word"))
            .executor(executor_fn(|source, context| {
                Box::pin(async move {
                    let word: String = context.require_one("word")?;
                    source.send_message(&word.to_uppercase());
                    Ok(())
                })
            }))
            .build()
            .unwrap();

        let source = TestSource::new();
        spec.process(&source, "hello").await.unwrap();
        assert_eq!(source.messages(), vec!["HELLO"]);
    }

    #[tokio::test]
    async fn test_executor_error_propagates_unchanged() {
        let spec = CommandSpec::builder()
            .executor(executor_fn(|_, _| Box::pin(async { Err(anyhow::anyhow!("disk on fire").into()) })))
            .build()
            .unwrap();
        let err = spec.process(&TestSource::new(), "").await.unwrap_err();
        assert!(!err.is_command_error());
        assert_eq!(err.to_string(), "disk on fire");
    }

    #[test]
    fn test_build_requires_executor() {
        let err = CommandSpec::builder().arguments(string("s")).build().unwrap_err();
        assert_eq!(err, SpecError::MissingExecutor);
    }

    #[test]
    fn test_help_layout() {
        let spec = CommandSpec::builder()
            .description("Rolls dice")
            .extended_description("Defaults to 1..to")
            .arguments(crate::args::seq(vec![integer("to"), optional(integer("from"))]))
            .executor(Counting(Arc::default()))
            .build()
            .unwrap();
        let source = TestSource::new();
        assert_eq!(spec.usage(&source), "<to> [<from>]");
        assert_eq!(spec.help(&source).unwrap(), "Rolls dice\n<to> [<from>]\nDefaults to 1..to");
        assert_eq!(spec.short_description(&source).as_deref(), Some("Rolls dice"));
        assert!(spec.as_spec().is_some());
    }

    #[test]
    fn test_help_omits_empty_usage() {
        let spec = CommandSpec::builder()
            .description("Checks that commands run")
            .executor(Counting(Arc::default()))
            .build()
            .unwrap();
        let source = TestSource::new();
        assert_eq!(spec.usage(&source), "");
        assert_eq!(spec.help(&source).unwrap(), "Checks that commands run");
    }
}
