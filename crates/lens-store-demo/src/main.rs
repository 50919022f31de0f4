mod actions;
mod logger;
mod reducer;
mod state;

use actions::Action;
use lens_store::{Snapshot, Store};
use lens_store_config::{ConfigSource, StoreConfig};
use state::AppState;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

fn main() -> anyhow::Result<()> {
    let loaded = StoreConfig::load();
    let config = match &loaded {
        Ok((config, _)) => config.clone(),
        Err(_) => StoreConfig::default(),
    };
    logger::init(&config.log_level);

    match &loaded {
        Ok((_, ConfigSource::File(path))) => {
            log::info!("Loaded store config from {}", path.display())
        }
        Ok((_, ConfigSource::Defaults)) => log::debug!("No config file found, using defaults"),
        Err(e) => log::warn!("{:#}; using default store config", e),
    }

    log::info!("Starting {}", config.name);

    let store: Store<AppState, Action> = Store::with_mode(config.equality);
    store.register(reducer::reduce)?;

    // Whole-state observer runs inside the dispatch critical section
    let notifications = Arc::new(AtomicUsize::new(0));
    let counted = notifications.clone();
    let _observer = store.observe(move |snapshot: Snapshot<AppState>| {
        counted.fetch_add(1, Ordering::Relaxed);
        log::trace!("State changed: {:?}", snapshot);
    });

    let mut values = store.subscribe_to(|s: &AppState| s.value);
    let mut users = store.subscribe_to(|s: &AppState| s.user.clone());

    store.dispatch(Action::Login("demo".to_string()));

    run_dispatchers(&store, config.dispatchers, config.dispatches_per_worker);

    store.dispatch(Action::Login("done".to_string()));

    let value_changes = values.drain();
    let user_changes = users.drain();

    println!("store:             {}", config.name);
    println!("equality:          {:?}", config.equality);
    println!("final state:       {:?}", store.state());
    println!("dispatches:        {}", store.dispatch_count());
    println!("notifications:     {}", notifications.load(Ordering::Relaxed));
    println!("value changes:     {}", value_changes.len());
    println!("user changes:      {:?}", user_changes);

    store.dispatch(Action::Reset);
    println!("after reset:       {:?}", store.state());
    println!("notifications:     {}", notifications.load(Ordering::Relaxed));

    log::info!("Exiting {}", config.name);
    Ok(())
}

/// Spawn `workers` threads, each alternating increments and decrements
/// with one extra increment per worker at the end
fn run_dispatchers(store: &Store<AppState, Action>, workers: usize, per_worker: usize) {
    thread::scope(|scope| {
        for worker in 0..workers {
            let store = store.clone();
            scope.spawn(move || {
                log::debug!("Dispatcher {} started", worker);
                for i in 0..per_worker {
                    let action = if i % 2 == 0 {
                        Action::Increment
                    } else {
                        Action::Decrement
                    };
                    store.dispatch(action);
                }
                store.dispatch(Action::Increment);
                log::debug!("Dispatcher {} finished", worker);
            });
        }
    });
}
