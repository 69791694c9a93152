// tests/gateway/reporter_tests.rs

#[cfg(test)]
mod tests {

    use crate::{Harness, at};
    use keymeter::{AdmissionResult, ReportError, UsageLedger};

    #[tokio::test]
    async fn repeated_reports_do_not_change_state() {
        let h = Harness::new();
        let client = h.client("owner", 5).await;
        for secs in 0..2 {
            h.state.admission.admit(Some(&client.api_key), at(secs)).await;
        }

        let mut before = h.ledger.entries().await.unwrap();
        // includes a report long after the window expired
        for secs in [5, 60, 5000, 5000] {
            let snapshot = h.state.reporter.report(&client.api_key, at(secs)).await.unwrap();
            assert_eq!(snapshot.used, 2);
            assert_eq!(snapshot.remaining, 3);
            assert_eq!(snapshot.window_start, at(0));
            assert_eq!(snapshot.window_end, at(3600));
        }
        let mut after = h.ledger.entries().await.unwrap();
        before.sort_by(|a, b| a.0.cmp(&b.0));
        after.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn report_without_ledger_entry() {
        let h = Harness::new();
        let client = h.client("owner", 9).await;

        let snapshot = h.state.reporter.report(&client.api_key, at(42)).await.unwrap();
        assert_eq!(snapshot.used, 0);
        assert_eq!(snapshot.remaining, 9);
        assert_eq!(snapshot.minutes_until_reset, 60);
        assert!(h.ledger.is_empty());
    }

    #[tokio::test]
    async fn admit_and_report_agree_on_key_lookup() {
        let h = Harness::new();
        let client = h.client("owner", 3).await;
        let padded = format!(" {}", client.api_key);

        assert_eq!(
            h.state.admission.admit(Some(&padded), at(0)).await,
            AdmissionResult::Forbidden
        );
        assert_eq!(
            h.state.reporter.report(&padded, at(0)).await,
            Err(ReportError::NotFound)
        );

        assert!(h.state.admission.admit(Some(&client.api_key), at(1)).await.is_admitted());
        assert_eq!(h.state.reporter.report(&client.api_key, at(1)).await.unwrap().used, 1);
    }

    #[tokio::test]
    async fn client_usage_is_scoped_to_owner() {
        let h = Harness::new();
        let client = h
            .state
            .clients
            .register("owner", "app", Some(2), at(0))
            .await
            .unwrap();
        h.state.admission.admit(Some(&client.api_key), at(1)).await;

        let snapshot = h.state.clients.usage("owner", client.id, at(2)).await.unwrap();
        assert_eq!(snapshot.used, 1);
        assert_eq!(snapshot.remaining, 1);
        assert!(h.state.clients.usage("intruder", client.id, at(2)).await.is_err());
    }
}
