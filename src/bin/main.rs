use clap::Parser;
use counted_avl::AvlTree;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Builds an AVL tree and prints its structure.
///
/// Without arguments, runs the built-in rotation and removal walkthrough.
#[derive(Debug, Parser)]
#[command(name = "counted-avl", version)]
struct Args {
    /// Keys to insert, in order.
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    insert: Vec<i64>,

    /// Keys to remove after inserting.
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    remove: Vec<i64>,

    /// Print a Graphviz rendering instead of the level-order listing.
    #[arg(long)]
    dot: bool,
}

fn print(tree: &AvlTree<i64>, dot: bool) {
    let mut out = String::new();

    let written = if dot {
        tree.dotgraph("tree", &mut out)
    } else {
        tree.write_breadth_first(&mut out)
    };

    // Writing into a `String` cannot fail.
    if written.is_ok() {
        println!("{out}");
    }
}

fn walkthrough(dot: bool) {
    let mut tree: AvlTree<i64> = AvlTree::new();

    tree.extend(0..3);
    tree.assert_invariants();
    info!(len = tree.len(), "inserted 0, 1, 2");
    print(&tree, dot);

    tree.extend([5, 4]);
    tree.assert_invariants();
    info!(len = tree.len(), "inserted 5, 4");
    print(&tree, dot);

    tree.extend([-3, -2]);
    tree.assert_invariants();
    info!(len = tree.len(), "inserted -3, -2");
    print(&tree, dot);

    tree.remove(&4);
    tree.assert_invariants();
    info!(len = tree.len(), "removed 4");
    print(&tree, dot);

    let first = tree.insert(-2);
    let second = tree.insert(-2);
    tree.assert_invariants();
    info!(?first, ?second, "inserted -2 twice");
    print(&tree, dot);

    tree.remove_at(first);
    tree.assert_invariants();
    info!(?first, "removed first duplicate");
    print(&tree, dot);

    tree.remove_at(second);
    tree.assert_invariants();
    info!(?second, "removed second duplicate");
    print(&tree, dot);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    if args.insert.is_empty() && args.remove.is_empty() {
        walkthrough(args.dot);
        return;
    }

    let mut tree: AvlTree<i64> = args.insert.iter().copied().collect();

    for key in &args.remove {
        if !tree.remove(key) {
            info!(key, "key not present");
        }
    }

    tree.assert_invariants();
    info!(len = tree.len(), "built tree");
    print(&tree, args.dot);
}
