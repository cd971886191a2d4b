//! Performance benchmark for tree refreshes
//! Run: cargo run --release --bin bench -- <dir> [depth]

use parking_lot::Mutex;
use spacetree::settings::load_settings;
use spacetree::{
    DirectoryModel, DirectoryTree, Entry, LocalNamespace, NoMetadata, RootDescriptor, Section,
    ShortcutStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Model that only remembers the current directory
#[derive(Default)]
struct BenchModel {
    current: Mutex<Option<Entry>>,
}

impl DirectoryModel for BenchModel {
    fn current_directory(&self) -> Option<Entry> {
        self.current.lock().clone()
    }

    fn change_directory(&self, entry: &Entry) {
        *self.current.lock() = Some(entry.clone());
    }

    fn activate_directory(&self, _entry: &Entry) {}

    fn on_item_not_found(&self, root: &RootDescriptor) {
        eprintln!("Root not found: {}", root.label);
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let root = args
        .next()
        .map(PathBuf::from)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let depth: usize = args.next().and_then(|d| d.parse().ok()).unwrap_or(3);

    println!("\n{}", "=".repeat(70));
    println!("Directory Tree Benchmark");
    println!("{}", "=".repeat(70));
    println!("Root: {:?}, expand depth: {}", root, depth);

    let settings = load_settings();
    println!(
        "Page size: {}, hidden dirs shown: {}",
        settings.read_page_size, settings.show_hidden_dirs
    );
    let shortcuts = match ShortcutStore::open_default() {
        Ok(store) => store.descriptors(Section::Top),
        Err(e) => {
            tracing::warn!("[Shortcuts] Not loading shortcuts: {}", e);
            Vec::new()
        }
    };
    let namespace = Arc::new(LocalNamespace::new(&root, settings.read_page_size));
    let volume = namespace.volume().clone();
    let tree = DirectoryTree::new(
        namespace,
        Arc::new(NoMetadata),
        Arc::new(BenchModel::default()),
        settings,
    );

    // Phase 1: root list
    let start = Instant::now();
    let mut descriptors = shortcuts;
    descriptors.push(RootDescriptor::volume(volume, Section::MyFiles));
    tree.set_root_descriptors(descriptors).await;
    let roots_time = start.elapsed();
    println!("\n[Test 1] Root list + first listing: {:?}", roots_time);
    println!("  Top-level rows: {}", tree.roots().len());

    // Phase 2: expand breadth-first
    let start = Instant::now();
    let mut level = tree.roots();
    let mut expanded = 0usize;
    for _ in 0..depth {
        let mut next = Vec::new();
        for id in level {
            if tree.expand(id).await.is_ok() {
                expanded += 1;
            }
            next.extend(tree.children(id));
        }
        level = next;
    }
    let expand_time = start.elapsed();
    let rows = count_rows(&tree);
    println!("\n[Test 2] Expand {} levels...", depth);
    println!("  Expanded nodes: {}", expanded);
    println!("  Materialized rows: {}", rows);
    println!("  Time: {:?}", expand_time);

    // Phase 3: recursive refresh with nothing changed
    let start = Instant::now();
    tree.update_roots(true).await;
    let refresh_time = start.elapsed();
    println!("\n[Test 3] No-op recursive refresh: {:?}", refresh_time);

    // Phase 4: change propagation for a path that does not exist
    let ghost = root.join("__bench_missing__").join("deeper");
    let start = Instant::now();
    let outcome = tree
        .update_tree_by_entry(&Entry::directory(spacetree::local::url_for(&ghost)))
        .await;
    let walk_time = start.elapsed();
    println!("\n[Test 4] Walk-up from missing path: {:?} ({:?})", walk_time, outcome);

    let total: Duration = roots_time + expand_time + refresh_time + walk_time;
    println!("\n{}", "-".repeat(50));
    println!("SUMMARY:");
    println!("  Total time:  {:?}", total);
    println!(
        "  Expand:      {:?} ({:.1}%)",
        expand_time,
        expand_time.as_secs_f64() / total.as_secs_f64() * 100.0
    );
    println!(
        "  Refresh:     {:?} ({:.1}%)",
        refresh_time,
        refresh_time.as_secs_f64() / total.as_secs_f64() * 100.0
    );
    if rows > 0 {
        println!(
            "  Per row:     {:.1} µs",
            refresh_time.as_secs_f64() * 1_000_000.0 / rows as f64
        );
    }
    println!("{}", "-".repeat(50));
}

fn count_rows(tree: &DirectoryTree) -> usize {
    fn count(node: &spacetree::RenderNode) -> usize {
        1 + node.children.iter().map(count).sum::<usize>()
    }
    tree.snapshot().iter().map(count).sum()
}
