// tests/gateway/concurrency_tests.rs

#[cfg(test)]
mod tests {

    use crate::{Harness, at};
    use futures::future::join_all;
    use keymeter::{AdmissionResult, LedgerEntry, UsageLedger};

    async fn burst(h: &Harness, api_key: &str, requests: usize, secs: i64) -> Vec<AdmissionResult> {
        let handles = (0..requests).map(|_| {
            let controller = h.state.admission.clone();
            let key = api_key.to_string();
            tokio::spawn(async move { controller.admit(Some(&key), at(secs)).await })
        });
        join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect()
    }

    fn count_admitted(results: &[AdmissionResult]) -> usize {
        results.iter().filter(|r| r.is_admitted()).count()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn parallel_requests_equal_to_limit_are_all_admitted() {
        let h = Harness::new();
        let client = h.client("owner", 64).await;

        // no entry yet: first requests also race on lazy creation
        let results = burst(&h, &client.api_key, 64, 0).await;

        assert_eq!(count_admitted(&results), 64);
        let entry = h.ledger.find(&client.api_key).await.unwrap().unwrap();
        assert_eq!(entry.count, 64);

        let mut remaining: Vec<u32> = results
            .iter()
            .filter_map(|r| match r {
                AdmissionResult::Admitted { remaining, .. } => Some(*remaining),
                _ => None,
            })
            .collect();
        remaining.sort_unstable();
        // every admitted request saw a distinct count
        assert_eq!(remaining, (0..64).collect::<Vec<u32>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn parallel_overload_never_over_admits() {
        let h = Harness::new();
        let client = h.client("owner", 40).await;

        let results = burst(&h, &client.api_key, 100, 10).await;

        assert_eq!(count_admitted(&results), 40);
        let limited = results
            .iter()
            .filter(|r| matches!(r, AdmissionResult::RateLimited { .. }))
            .count();
        assert_eq!(limited, 60);
        assert_eq!(
            h.ledger.find(&client.api_key).await.unwrap().unwrap().count,
            40
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn parallel_requests_across_a_window_reset() {
        let h = Harness::new();
        let client = h.client("owner", 10).await;

        // exhausted window from long ago
        let start = h.ledger.find_or_create(&client.api_key, at(0)).await.unwrap();
        h.ledger
            .compare_and_swap(&client.api_key, start, LedgerEntry { count: 10, ..start })
            .await
            .unwrap();

        let results = burst(&h, &client.api_key, 30, 7200).await;

        assert_eq!(count_admitted(&results), 10);
        assert_eq!(
            h.ledger.find(&client.api_key).await.unwrap(),
            Some(LedgerEntry {
                count: 10,
                window_start: at(7200),
            })
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn keys_do_not_share_quota() {
        let h = Harness::new();
        let a = h.client("owner", 5).await;
        let b = h.client("owner", 5).await;

        let (ra, rb) = tokio::join!(burst(&h, &a.api_key, 8, 0), burst(&h, &b.api_key, 8, 0));
        assert_eq!(count_admitted(&ra), 5);
        assert_eq!(count_admitted(&rb), 5);
    }
}
