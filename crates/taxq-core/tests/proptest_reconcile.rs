use proptest::prelude::*;
use taxq_core::model::WorkItem;
use taxq_core::reconcile::{check_ranks, reconcile};

use generators::*;

fn ranks_of(items: &[WorkItem], pick: impl Fn(&WorkItem) -> Option<u32>) -> Vec<u32> {
    let mut ranks: Vec<u32> = items.iter().filter_map(pick).collect();
    ranks.sort_unstable();
    ranks
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(2000))]

    #[test]
    fn positions_are_dense_over_open_items(queue in arb_queue()) {
        let out = reconcile(queue, &roles()).expect("known statuses");
        let open = out.iter().filter(|i| i.status_id != COMPLETED).count();
        let expected: Vec<u32> = (1..).take(open).collect();
        prop_assert_eq!(ranks_of(&out, |i| i.position), expected);
    }

    #[test]
    fn client_ranks_cover_received_only(queue in arb_queue()) {
        let out = reconcile(queue, &roles()).expect("known statuses");
        for item in &out {
            prop_assert_eq!(item.external_queue_position.is_some(), item.status_id == RECEIVED);
        }
        let received = out.iter().filter(|i| i.status_id == RECEIVED).count();
        let expected: Vec<u32> = (1..).take(received).collect();
        prop_assert_eq!(ranks_of(&out, |i| i.external_queue_position), expected);
    }

    #[test]
    fn completed_items_hold_no_rank(queue in arb_queue()) {
        let out = reconcile(queue, &roles()).expect("known statuses");
        for item in out.iter().filter(|i| i.status_id == COMPLETED) {
            prop_assert_eq!(item.ranks(), (None, None));
        }
    }

    #[test]
    fn input_order_is_preserved(queue in arb_queue()) {
        let input_ids: Vec<i64> = queue.iter().map(|i| i.id).collect();
        let open_ids: Vec<i64> = queue
            .iter()
            .filter(|i| i.status_id != COMPLETED)
            .map(|i| i.id)
            .collect();

        let out = reconcile(queue, &roles()).expect("known statuses");
        prop_assert_eq!(out.iter().map(|i| i.id).collect::<Vec<_>>(), input_ids);

        let mut by_position: Vec<(u32, i64)> =
            out.iter().filter_map(|i| i.position.map(|p| (p, i.id))).collect();
        by_position.sort_unstable();
        prop_assert_eq!(by_position.into_iter().map(|(_, id)| id).collect::<Vec<_>>(), open_ids);
    }

    #[test]
    fn reconcile_is_idempotent(queue in arb_queue()) {
        let once = reconcile(queue, &roles()).expect("known statuses");
        let twice = reconcile(once.clone(), &roles()).expect("known statuses");
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn reconciled_queue_passes_the_checker(queue in arb_queue()) {
        let out = reconcile(queue, &roles()).expect("known statuses");
        prop_assert_eq!(check_ranks(&out, &roles()).expect("known statuses"), Ok(()));
    }
}
