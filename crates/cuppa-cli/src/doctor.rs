use cuppa_core::{ItemSource, KvStore, Probe};
use std::path::Path;

/// Prints one line per check. Never fails; problems are reported with a hint.
pub fn run<P: Probe>(source: &ItemSource<P>, store: anyhow::Result<Box<dyn KvStore>>, db: &Path) {
    println!("settings: {}", crate::config::settings_path().display());
    match store.and_then(|s| s.init().map(|_| s)) {
        Ok(_) => println!("store: ok ({})", db.display()),
        Err(e) => {
            println!("store: failed ({:#})", e);
            println!("hint: check that {} is writable", db.display());
        }
    }
    let endpoint = source.endpoint();
    match source.probe().probe(&endpoint) {
        Ok(()) => println!("upstream: ok ({})", endpoint),
        Err(e) => {
            println!("upstream: unreachable ({}: {:#})", endpoint, e);
            println!("hint: set [source] base_url in settings.toml or pass --base-url");
        }
    }
}
