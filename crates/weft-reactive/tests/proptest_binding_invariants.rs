//! Property tests for the binding and change-protocol invariants.

use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use weft_reactive::ObservableValue;

proptest! {
    /// One-way binding: after any write sequence, the target equals the
    /// converter applied to the last written value and the source is
    /// untouched by the binding.
    #[test]
    fn one_way_target_tracks_last_write(writes in proptest::collection::vec(-1000i64..1000, 1..40)) {
        let source = ObservableValue::new(0i64);
        let target = ObservableValue::new(0i64);
        target.bind(&source, |v| v * 3 + 1).unwrap();

        for &w in &writes {
            source.set(w);
        }
        let last = *writes.last().unwrap();
        prop_assert_eq!(source.value(), last);
        prop_assert_eq!(target.value(), last * 3 + 1);
    }

    /// Two-way binding: whichever side was written last, both sides agree.
    #[test]
    fn two_way_sides_always_agree(writes in proptest::collection::vec((any::<bool>(), -1000i64..1000), 1..40)) {
        let a = ObservableValue::new(0i64);
        let b = ObservableValue::new(0i64);
        a.bind_two_way(&b).unwrap();

        for &(to_a, value) in &writes {
            if to_a { a.set(value) } else { b.set(value) }
        }
        prop_assert_eq!(a.value(), b.value());
        prop_assert_eq!(a.value(), writes.last().unwrap().1);
    }

    /// The changed notification fires exactly once per distinct consecutive
    /// value, never for equal re-sets.
    #[test]
    fn changed_fires_once_per_distinct_write(writes in proptest::collection::vec(0i32..6, 1..60)) {
        let cell = ObservableValue::new(-1i32);
        let fired = Arc::new(AtomicUsize::new(0));
        let count = Arc::clone(&fired);
        let _sub = cell.on_value_changed(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        });

        let mut expected = 0usize;
        let mut current = -1i32;
        for &w in &writes {
            if w != current {
                expected += 1;
                current = w;
            }
            cell.set(w);
        }
        prop_assert_eq!(fired.load(Ordering::SeqCst), expected);
    }

    /// Chained one-way bindings propagate end to end in one synchronous pass.
    #[test]
    fn chains_propagate_transitively(writes in proptest::collection::vec(-500i64..500, 1..20)) {
        let a = ObservableValue::new(0i64);
        let b = ObservableValue::new(0i64);
        let c = ObservableValue::new(0i64);
        b.bind(&a, |v| v + 1).unwrap();
        c.bind(&b, |v| v * 2).unwrap();

        for &w in &writes {
            a.set(w);
            prop_assert_eq!(b.value(), w + 1);
            prop_assert_eq!(c.value(), (w + 1) * 2);
        }
    }

    /// Unbinding freezes the target at its last propagated value.
    #[test]
    fn unbind_freezes_the_target(before in -1000i64..1000, after in -1000i64..1000) {
        let source = ObservableValue::new(0i64);
        let target = ObservableValue::new(0i64);
        target.bind_identity(&source).unwrap();

        source.set(before);
        target.unbind().unwrap();
        source.set(after);

        prop_assert_eq!(target.value(), before);
        prop_assert_eq!(source.value(), after);
    }
}
