/*! Gesture-to-candidate pipeline for swipe keyboards.

Turns a continuous touch trajectory on a virtual keyboard into a ranked list
of candidate words. The crate covers the cheap, synchronous stages that run on
the input thread (gesture shape, tap/swipe decision, path simplification,
probabilistic key attribution, dictionary pruning, typo correction) and the
orchestration around an expensive external scorer (similarity-keyed result
cache, single-flight submission, cancellation of superseded requests).

# Usage examples

```no_run
use std::sync::Arc;
use swipetype::config::EngineConfig;
use swipetype::dictionary::Dictionary;
use swipetype::engine::SwipeEngine;
use swipetype::layout::KeyboardLayout;
use swipetype::predictor::LexiconBackend;
use swipetype::types::Point;

let dictionary = Dictionary::from_iter(vec![("hello", 120), ("help", 80)]);
let layout = Arc::new(KeyboardLayout::qwerty());
let config = EngineConfig::default();
let backend = LexiconBackend::new(&layout, 1000.0, 300.0, dictionary.clone(), &config);
let engine = SwipeEngine::new(config, layout, 1000.0, 300.0, dictionary, Arc::new(backend))?;

let mut touch = engine.begin_touch(Point::new(550.0, 150.0), 0);
touch.move_to(Point::new(250.0, 50.0), 40);
touch.move_to(Point::new(850.0, 150.0), 90);
let gesture = touch.finish();

let handle = engine.submit(gesture.trajectory);
if let Some(Ok(result)) = handle.wait() {
    println!("{:?}", result.words());
}
# Ok::<(), std::io::Error>(())
```

Further examples can be found in the [`swipetype-bin`] command-line tool in
the same repository.

[`swipetype-bin`]: ../swipetype_bin/index.html

*/

#![warn(missing_docs)]
pub mod cache;
pub mod classifier;
pub mod config;
pub mod correction;
pub mod dictionary;
pub mod engine;
pub mod error;
pub mod gesture;
pub mod layout;
pub mod mapper;
pub mod orchestrator;
pub mod predictor;
pub mod pruner;
pub mod simplify;
pub mod types;

pub(crate) mod constants;

/// Installs `env_logger` as the global logger, honouring `RUST_LOG`.
///
/// Embedders with their own `log` implementation should not call this.
#[cfg(feature = "logging")]
pub fn enable_logging() {
    let _ = env_logger::try_init();
}
