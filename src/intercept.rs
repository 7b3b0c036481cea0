//! Interception layer
//!
//! Wraps externally supplied operations (device command callables, the
//! sleep primitive, subprocess execution) so every invocation is timed
//! without changing call sites. Instead of monkey-patching, the crate
//! exposes an explicit wrap/registration mechanism: call sites receive the
//! instrumented variant through a registry lookup keyed by operation
//! identity, or directly from the [`wrap`] higher-order function.

use crate::category::Category;
use crate::context::SharedRunContext;
use crate::ledger::OperationKey;
use crate::sample::SourceKind;
use anyhow::{bail, Result};
use std::collections::{HashMap, HashSet};
use std::process::{Command, Output};
use std::time::{Duration, Instant};

/// An externally supplied device command: input string in, response out.
pub type Operation = Box<dyn FnMut(&str) -> Result<String> + Send>;

/// Identifies the code location a sleep was invoked from.
///
/// Supplied explicitly by the caller; it replaces the original design's
/// call-frame introspection.
#[derive(Debug, Clone)]
pub struct CallSite {
    /// Owning type of the calling method
    pub owner: String,
    /// Name of the calling method
    pub method: String,
    /// Source file of the calling method, used for infra classification
    pub file: String,
}

impl CallSite {
    pub fn new(
        owner: impl Into<String>,
        method: impl Into<String>,
        file: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            method: method.into(),
            file: file.into(),
        }
    }

    fn sleep_key(&self) -> OperationKey {
        format!("{}.{}.sleep", self.owner, self.method)
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::from_path(&self.file)
    }
}

/// A named member of a test-subject type, offered for instrumentation.
pub struct MethodSpec {
    pub name: String,
    /// Source file of the member, used for infra classification
    pub file: Option<String>,
    pub op: Operation,
}

impl MethodSpec {
    pub fn new(name: impl Into<String>, op: Operation) -> Self {
        Self {
            name: name.into(),
            file: None,
            op,
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

/// Wrap an operation so each successful invocation records a sample under
/// `key` and `category` against the attribution current at call time.
///
/// The wrapper calls the original exactly once and times only that call.
/// Errors re-propagate and leave no sample, so partial operations never
/// skew the sums.
pub fn wrap<F>(
    ctx: SharedRunContext,
    key: OperationKey,
    category: Category,
    tag: Option<SourceKind>,
    mut op: F,
) -> impl FnMut(&str) -> Result<String> + Send
where
    F: FnMut(&str) -> Result<String> + Send,
{
    move |arg: &str| {
        let start = Instant::now();
        let result = op(arg)?;
        let elapsed_us = start.elapsed().as_secs_f64() * 1_000_000.0;
        ctx.record(category, key.clone(), elapsed_us, tag);
        Ok(result)
    }
}

/// Single wrapper factory for prefix-selected members.
///
/// Classification by prefix happens at call time, as both prefixes funnel
/// through the same factory.
fn wrap_member(
    ctx: SharedRunContext,
    owner: &str,
    method: &str,
    tag: Option<SourceKind>,
    mut op: Operation,
) -> Operation {
    let key: OperationKey = format!("{}.{}", owner, method);
    let method = method.to_string();
    Box::new(move |arg: &str| {
        let start = Instant::now();
        let result = op(arg)?;
        let elapsed_us = start.elapsed().as_secs_f64() * 1_000_000.0;
        if let Some(category) = Category::from_method_prefix(&method) {
            ctx.record(category, key.clone(), elapsed_us, tag);
        }
        Ok(result)
    })
}

/// Registry of instrumented operations plus the sleep and subprocess
/// timers.
pub struct Interceptor {
    ctx: SharedRunContext,
    ops: HashMap<OperationKey, Operation>,
    installed: HashSet<String>,
    denylist: HashSet<String>,
}

impl Interceptor {
    pub fn new(ctx: SharedRunContext) -> Self {
        // Lifecycle setup members match the `set` prefix but must never be
        // timed as device commands.
        let denylist = ["setup", "setup_method", "setup_class"]
            .into_iter()
            .map(String::from)
            .collect();
        Self {
            ctx,
            ops: HashMap::new(),
            installed: HashSet::new(),
            denylist,
        }
    }

    /// Instrument the qualifying members of one owning type.
    ///
    /// Members whose name starts with `set` or `get` are wrapped and
    /// registered under `<owner>.<member>`; denylisted and non-matching
    /// members are skipped, never an error. Installation is idempotent per
    /// owner: once a type's members have been wrapped, repeated attempts
    /// are no-ops, which prevents double-counting via stacked wrappers.
    ///
    /// Returns the keys registered by this call.
    pub fn install(
        &mut self,
        owner: &str,
        methods: impl IntoIterator<Item = MethodSpec>,
    ) -> Vec<OperationKey> {
        if !self.installed.insert(owner.to_string()) {
            tracing::debug!(owner, "already instrumented, skipping install");
            return Vec::new();
        }

        let mut registered = Vec::new();
        for spec in methods {
            if self.denylist.contains(&spec.name) {
                tracing::debug!(owner, member = %spec.name, "denylisted member skipped");
                continue;
            }
            if Category::from_method_prefix(&spec.name).is_none() {
                continue;
            }
            let tag = Some(
                spec.file
                    .as_deref()
                    .map(SourceKind::from_path)
                    .unwrap_or(SourceKind::Infra),
            );
            let key = format!("{}.{}", owner, spec.name);
            let wrapped = wrap_member(self.ctx.clone(), owner, &spec.name, tag, spec.op);
            self.ops.insert(key.clone(), wrapped);
            registered.push(key);
        }
        registered
    }

    /// Whether a type's members have already been wrapped.
    pub fn is_installed(&self, owner: &str) -> bool {
        self.installed.contains(owner)
    }

    /// Invoke an instrumented operation by identity.
    pub fn invoke(&mut self, owner: &str, method: &str, arg: &str) -> Result<String> {
        let key = format!("{}.{}", owner, method);
        match self.ops.get_mut(&key) {
            Some(op) => op(arg),
            None => bail!("no instrumented operation registered for {key}"),
        }
    }

    /// Timed sleep primitive.
    ///
    /// Sleeps for `duration`, then records the elapsed wall clock under
    /// `<CallerType>.<caller_method>.sleep` tagged with the source
    /// classification of the caller's file.
    pub fn sleep(&self, site: &CallSite, duration: Duration) {
        let start = Instant::now();
        std::thread::sleep(duration);
        let elapsed_us = start.elapsed().as_secs_f64() * 1_000_000.0;
        self.ctx.record(
            Category::SleepTime,
            site.sleep_key(),
            elapsed_us,
            Some(site.source_kind()),
        );
    }

    /// Timed subprocess execution.
    ///
    /// Runs the command to completion and records the elapsed wall clock
    /// under the program name. Spawn failures propagate and are not
    /// recorded.
    pub fn run_command(
        &self,
        program: &str,
        args: impl IntoIterator<Item = impl AsRef<std::ffi::OsStr>>,
    ) -> std::io::Result<Output> {
        let start = Instant::now();
        let output = Command::new(program).args(args).output()?;
        let elapsed_us = start.elapsed().as_secs_f64() * 1_000_000.0;
        self.ctx
            .record(Category::BashTime, program.to_string(), elapsed_us, None);
        Ok(output)
    }

    /// Handle to the run context the interceptor records into.
    pub fn context(&self) -> &SharedRunContext {
        &self.ctx
    }
}
