use proptest::prelude::*;
use strata_lighting::{LightPropagationItem, PropagationMode, PropagationQueue};

fn arb_mode() -> impl Strategy<Value = PropagationMode> {
    prop_oneof![Just(PropagationMode::Spread), Just(PropagationMode::Unspread)]
}

fn arb_item() -> impl Strategy<Value = LightPropagationItem> {
    (-512i32..=512, -64i32..=320, -512i32..=512, any::<u8>(), arb_mode())
        .prop_map(|(x, y, z, i, m)| LightPropagationItem::new(x, y, z, i, m))
}

proptest! {
    // Each mode lane keeps FIFO order and every pushed item comes back once
    #[test]
    fn queue_preserves_fifo_per_mode(items in prop::collection::vec(arb_item(), 0..64)) {
        let mut q = PropagationQueue::new();
        q.extend(items.iter().copied());
        prop_assert_eq!(q.len(), items.len());

        let mut out = Vec::new();
        while let Some(i) = q.pop() {
            out.push(i);
        }
        let expect_unspread: Vec<_> = items.iter().copied().filter(|i| !i.mode().is_spread()).collect();
        let expect_spread: Vec<_> = items.iter().copied().filter(|i| i.mode().is_spread()).collect();
        let mut expect = expect_unspread;
        expect.extend(expect_spread);
        prop_assert_eq!(out, expect);
    }

    // step never raises intensity and never yields zero
    #[test]
    fn step_is_monotone(item in arb_item(), falloff in any::<u8>()) {
        if let Some(next) = item.step(0, 0, 1, falloff) {
            prop_assert!(next.intensity() < item.intensity());
            prop_assert!(next.intensity() > 0);
            prop_assert_eq!(next.mode(), item.mode());
        }
    }
}
