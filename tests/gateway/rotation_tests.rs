// tests/gateway/rotation_tests.rs

#[cfg(test)]
mod tests {

    use crate::{Harness, at};
    use keymeter::{AdmissionResult, ReportError, UsageLedger};

    #[tokio::test]
    async fn rotated_key_is_forbidden_and_new_key_starts_empty() {
        let h = Harness::new();
        let client = h
            .state
            .clients
            .register("owner", "app", Some(3), at(0))
            .await
            .unwrap();

        for secs in 0..3 {
            assert!(h
                .state
                .admission
                .admit(Some(&client.api_key), at(secs))
                .await
                .is_admitted());
        }

        let (old_key, new_key) = h
            .state
            .clients
            .rotate_key("owner", client.id, at(10))
            .await
            .unwrap();
        assert_eq!(old_key, client.api_key);

        assert_eq!(
            h.state.admission.admit(Some(&old_key), at(11)).await,
            AdmissionResult::Forbidden
        );
        assert_eq!(h.ledger.find(&old_key).await.unwrap(), None);

        let snapshot = h.state.reporter.report(&new_key, at(11)).await.unwrap();
        assert_eq!(snapshot.used, 0);
        assert_eq!(snapshot.remaining, 3);

        match h.state.admission.admit(Some(&new_key), at(12)).await {
            AdmissionResult::Admitted { remaining, .. } => assert_eq!(remaining, 2),
            other => panic!("new key should be admitted, got {other:?}"),
        }
        assert_eq!(
            h.state.reporter.report(&old_key, at(12)).await,
            Err(ReportError::NotFound)
        );
    }

    #[tokio::test]
    async fn deleted_client_key_stops_working() {
        let h = Harness::new();
        let client = h
            .state
            .clients
            .register("owner", "app", Some(3), at(0))
            .await
            .unwrap();
        assert!(h
            .state
            .admission
            .admit(Some(&client.api_key), at(0))
            .await
            .is_admitted());

        h.state.clients.delete("owner", client.id).await.unwrap();

        assert_eq!(
            h.state.admission.admit(Some(&client.api_key), at(1)).await,
            AdmissionResult::Forbidden
        );
        assert!(h.ledger.is_empty());
    }
}
