//! Simple standalone example of segment grouping.
//!
//! Merges a few segments into equivalence groups, inspects them, and prints
//! the canonical serialization used for saved view state.
//!
//! Run with: cargo run --example simple

use segment_sets::{DisjointUint64Sets, Uint64, Uint64Set};

fn main() {
    println!("=== Simple Segment Sets Example ===\n");

    let mut equivalences = DisjointUint64Sets::new();

    println!("Merging segments 10 + 20, then 20 + 5:");
    equivalences.link(Uint64::new(10), Uint64::new(20));
    equivalences.link(Uint64::new(20), Uint64::new(5));

    let members: Vec<String> = equivalences
        .set_elements(Uint64::new(5))
        .map(|id| id.to_string())
        .collect();
    println!("  Group containing 5: {:?}", members);
    println!(
        "  Representative of 10: {}",
        equivalences.get(Uint64::new(10))
    );
    println!("  Generation: {}", equivalences.generation());

    println!("\nMerging the same pair again is a no-op:");
    let merged = equivalences.link(Uint64::new(5), Uint64::new(10));
    println!("  merged = {}, generation = {}", merged, equivalences.generation());

    println!("\nA second group with a large id:");
    let large: Uint64 = "18446744073709551615".parse().unwrap();
    equivalences.link(Uint64::new(3), large);
    println!(
        "  Saved state: {}",
        serde_json::to_string(&equivalences).unwrap()
    );

    println!("\n=== Visible Segments ===");
    let mut visible = Uint64Set::new();
    visible.changed().add(|change| println!("  changed: {:?}", change));
    visible.add(vec![Uint64::new(2), Uint64::new(10), Uint64::new(1)]);
    visible.add(Uint64::new(2));
    visible.delete(Uint64::new(1));
    println!(
        "  Saved state (lexicographic): {}",
        serde_json::to_string(&visible).unwrap()
    );

    println!("\n=== Example Complete ===");
}
