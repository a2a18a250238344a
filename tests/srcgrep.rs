//! End-to-end pipeline test: a pool of per-directory machines recursively
//! walks an in-memory filesystem tree and greps `.rs` files for a needle.
//!
//! Exercises the whole surface together: operation completions with echoed
//! arguments, guard redirects and exits, self-loops over a directory listing,
//! child emissions forwarded to the controller, FIFO backpressure, and
//! quiescence detection.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use statevisor::{
    Chart, EventName, OpOutcome, OpProvider, Pool, PoolConfig, PoolError, PoolHandle, Redirect,
    StateDef, Step,
};

/// Payload shared by controller, children, and provider.
#[derive(Debug, Clone, PartialEq)]
enum Val {
    Str(String),
    List(Vec<Val>),
}

impl Val {
    fn str(s: impl Into<String>) -> Self {
        Val::Str(s.into())
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            Val::Str(s) => Some(s),
            Val::List(_) => None,
        }
    }
}

/// One filesystem node.
enum Node {
    Dir(Vec<&'static str>),
    File(&'static str),
}

/// Provider backed by a static tree: `fs.readdir`, `fs.lstat`, `fs.readfile`.
struct MockFs {
    tree: HashMap<&'static str, Node>,
}

impl MockFs {
    fn sample() -> Arc<Self> {
        let mut tree = HashMap::new();
        tree.insert("/src", Node::Dir(vec!["main.rs", "lib.rs", "util", "README.md"]));
        tree.insert("/src/main.rs", Node::File("fn main() {\n    run(); // TODO wire cli\n}\n"));
        tree.insert("/src/lib.rs", Node::File("pub fn run() {}\n"));
        tree.insert("/src/util", Node::Dir(vec!["io.rs", "notes.txt"]));
        tree.insert(
            "/src/util/io.rs",
            Node::File("// TODO buffer reads\nfn read() {}\n// TODO buffer writes\n"),
        );
        tree.insert("/src/util/notes.txt", Node::File("TODO not rust, skipped\n"));
        tree.insert("/src/README.md", Node::File("TODO in markdown, skipped\n"));
        Arc::new(Self { tree })
    }

    fn node(&self, path: &str) -> Result<&Node, String> {
        self.tree
            .get(path)
            .ok_or_else(|| format!("no such path: {path}"))
    }
}

#[async_trait]
impl OpProvider<Val> for MockFs {
    async fn invoke(&self, op: &EventName, args: Option<Val>) -> OpOutcome<Val> {
        let Some(path) = args.as_ref().and_then(Val::as_str) else {
            return OpOutcome::Err(statevisor::OpError::new("missing path argument"));
        };
        let outcome = match (op.as_str(), self.node(path)) {
            ("fs.readdir", Ok(Node::Dir(names))) => {
                Ok(Some(Val::List(names.iter().copied().map(Val::str).collect())))
            }
            ("fs.lstat", Ok(node)) => Ok(Some(Val::str(match node {
                Node::Dir(_) => "dir",
                Node::File(_) => "file",
            }))),
            ("fs.readfile", Ok(Node::File(content))) => Ok(Some(Val::str(*content))),
            (_, Err(missing)) => Err(missing),
            (op, Ok(_)) => Err(format!("{op}: wrong node kind at {path}")),
        };
        match outcome {
            Ok(result) => OpOutcome::Done(result),
            Err(message) => OpOutcome::Err(statevisor::OpError::new(message)),
        }
    }
}

/// Per-directory machine context.
#[derive(Default)]
struct Walker {
    dir: String,
    listing: VecDeque<String>,
}

/// ReadDir → ListStat (self-loop over entries) → ReadFile → Match → back.
fn walker_chart(needle: &'static str) -> Arc<Chart<Walker, Val>> {
    Arc::new(
        Chart::builder("ReadDir")
            .state(
                StateDef::<Walker, Val>::new("ReadDir")
                    .entry(|fire, args| {
                        if let Some(path) = args.and_then(Val::as_str) {
                            fire.ctx().dir = path.to_string();
                        }
                    })
                    .op("fs.readdir")
                    .on(".done", |fire, ev| {
                        if let Some(Val::List(names)) = ev.payload() {
                            fire.ctx().listing = names
                                .iter()
                                .filter_map(|n| n.as_str().map(str::to_string))
                                .collect();
                        }
                        Some(Step::next("ListStat", None))
                    })
                    .on(".err", |fire, ev| {
                        fire.emit("fsErr", ev.error().map(|e| Val::str(e.message.clone())));
                        Some(Step::exit(None))
                    }),
            )
            .state(
                StateDef::<Walker, Val>::new("ListStat")
                    .guard(|fire, _args| {
                        fire.ctx().listing.is_empty().then_some(Redirect::Exit)
                    })
                    .op_with("fs.lstat", |fire, _args| {
                        let ctx = fire.ctx();
                        let name = ctx.listing.pop_front()?;
                        Some(Val::str(format!("{}/{name}", ctx.dir)))
                    })
                    .on(".done", |fire, ev| {
                        let path = ev.op_args().cloned();
                        match ev.payload().and_then(Val::as_str) {
                            Some("file") => Some(Step::next("ReadFile", path)),
                            Some("dir") => {
                                fire.emit("addDir", path);
                                Some(Step::stay(None))
                            }
                            _ => Some(Step::stay(None)),
                        }
                    })
                    .on(".err", |fire, ev| {
                        fire.emit("fsErr", ev.error().map(|e| Val::str(e.message.clone())));
                        Some(Step::stay(None))
                    }),
            )
            .state(
                StateDef::<Walker, Val>::new("ReadFile")
                    .guard(|_fire, args| {
                        let is_rs = args
                            .and_then(Val::as_str)
                            .is_some_and(|p| p.ends_with(".rs"));
                        (!is_rs).then(|| Redirect::goto("ListStat"))
                    })
                    .op("fs.readfile")
                    .on(".done", |_fire, ev| {
                        let bundle = match (ev.op_args(), ev.payload()) {
                            (Some(path), Some(content)) => {
                                Some(Val::List(vec![path.clone(), content.clone()]))
                            }
                            _ => None,
                        };
                        Some(Step::next("Match", bundle))
                    })
                    .on(".err", |fire, ev| {
                        fire.emit("fsErr", ev.error().map(|e| Val::str(e.message.clone())));
                        Some(Step::next("ListStat", None))
                    }),
            )
            .state(
                StateDef::<Walker, Val>::new("Match")
                    .work(move |fire, args| {
                        if let Some(Val::List(bundle)) = args {
                            if let [Val::Str(path), Val::Str(content)] = bundle.as_slice() {
                                let hits: Vec<Val> = content
                                    .lines()
                                    .enumerate()
                                    .filter(|(_, line)| line.contains(needle))
                                    .map(|(i, line)| Val::str(format!("{}:{line}", i + 1)))
                                    .collect();
                                if !hits.is_empty() {
                                    fire.emit(
                                        "addMatch",
                                        Some(Val::List(vec![
                                            Val::str(path),
                                            Val::List(hits),
                                        ])),
                                    );
                                }
                            }
                        }
                        (EventName::new("scanned").unwrap(), None)
                    })
                    .to("scanned", "ListStat"),
            )
            .build()
            .unwrap(),
    )
}

struct Manager {
    handle: PoolHandle<Val>,
}

/// Seeds the root directory, feeds discovered directories back in, collects
/// matches, and acknowledges quiescence.
fn manager_chart(root: &'static str) -> Arc<Chart<Manager, Val>> {
    Arc::new(
        Chart::builder("Manage")
            .state(
                StateDef::<Manager, Val>::new("Manage")
                    .entry(move |fire, _| {
                        let handle = fire.ctx().handle.clone();
                        let _ = handle.submit(Val::str(root));
                    })
                    .on("proc.addDir", |fire, ev| {
                        if let Some(dir) = ev.payload() {
                            let handle = fire.ctx().handle.clone();
                            let _ = handle.submit(dir.clone());
                        }
                        None
                    })
                    .on("proc.addMatch", |fire, ev| {
                        if let Some(Val::List(bundle)) = ev.payload() {
                            if let [Val::Str(path), hits @ Val::List(_)] = bundle.as_slice() {
                                let handle = fire.ctx().handle.clone();
                                let _ = handle.record(path.clone(), hits.clone());
                            }
                        }
                        None
                    })
                    .on("proc.fsErr", |fire, ev| {
                        if let Some(Val::Str(message)) = ev.payload() {
                            let handle = fire.ctx().handle.clone();
                            let _ = handle.record("error", Val::str(message.clone()));
                        }
                        None
                    })
                    .on("proc.threshold", |_fire, _ev| None)
                    .on("proc.quiet", |fire, _ev| {
                        let handle = fire.ctx().handle.clone();
                        let _ = handle.confirm_quiet();
                        None
                    }),
            )
            .build()
            .unwrap(),
    )
}

fn grep_pool(
    needle: &'static str,
    root: &'static str,
    fs: Arc<MockFs>,
) -> Pool<Manager, Walker, Val> {
    Pool::new(
        PoolConfig::new(2).with_scope("proc"),
        manager_chart(root),
        |handle| Manager { handle },
        walker_chart(needle),
        Walker::default,
        fs,
    )
}

#[tokio::test]
async fn test_recursive_grep_finds_all_rust_matches() {
    let pool = grep_pool("TODO", "/src", MockFs::sample());
    let results = pool.run(CancellationToken::new()).await.unwrap();

    // Only .rs files count; the txt and markdown hits are filtered by the
    // ReadFile guard.
    let mut paths: Vec<&str> = results.keys().map(String::as_str).collect();
    paths.sort_unstable();
    assert_eq!(paths, vec!["/src/main.rs", "/src/util/io.rs"]);

    assert_eq!(
        results.get("/src/main.rs"),
        Some(&Val::List(vec![Val::str("2:    run(); // TODO wire cli")]))
    );
    assert_eq!(
        results.get("/src/util/io.rs"),
        Some(&Val::List(vec![
            Val::str("1:// TODO buffer reads"),
            Val::str("3:// TODO buffer writes"),
        ]))
    );
}

#[tokio::test]
async fn test_no_matches_yields_empty_map() {
    let pool = grep_pool("NEEDLE_THAT_IS_NOWHERE", "/src", MockFs::sample());
    let results = pool.run(CancellationToken::new()).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_missing_root_surfaces_as_fs_error_not_a_crash() {
    // The walker exits through its .err route; the controller still reaches
    // quiescence and the pool completes cleanly.
    let fs = MockFs::sample();
    let controller: Arc<Chart<Manager, Val>> = Arc::new(
        Chart::builder("Manage")
            .state(
                StateDef::<Manager, Val>::new("Manage")
                    .entry(|fire, _| {
                        let handle = fire.ctx().handle.clone();
                        let _ = handle.submit(Val::str("/missing"));
                    })
                    .on("proc.fsErr", |fire, ev| {
                        if let Some(Val::Str(message)) = ev.payload() {
                            let handle = fire.ctx().handle.clone();
                            let _ = handle.record("error", Val::str(message.clone()));
                        }
                        None
                    })
                    .on("proc.threshold", |_fire, _ev| None)
                    .on("proc.quiet", |fire, _ev| {
                        let handle = fire.ctx().handle.clone();
                        let _ = handle.confirm_quiet();
                        None
                    }),
            )
            .build()
            .unwrap(),
    );
    let pool = Pool::new(
        PoolConfig::new(2).with_scope("proc"),
        controller,
        |handle| Manager { handle },
        walker_chart("TODO"),
        Walker::default,
        fs,
    );
    let results = pool.run(CancellationToken::new()).await.unwrap();
    assert!(results
        .get("error")
        .and_then(Val::as_str)
        .is_some_and(|m| m.contains("/missing")));
}

#[tokio::test]
async fn test_cancelled_pool_reports_cancellation() {
    let pool = grep_pool("TODO", "/src", MockFs::sample());
    let token = CancellationToken::new();
    token.cancel();
    let err = pool.run(token).await.unwrap_err();
    assert!(matches!(err, PoolError::Cancelled));
}
