// tests/gateway/snapshot_tests.rs

#[cfg(test)]
mod tests {

    use crate::{Harness, at};
    use keymeter::AdmissionResult;
    use keymeter::snapshot::{self, Snapshot};

    #[tokio::test]
    async fn missing_state_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = snapshot::load(&dir.path().join("absent.json")).await.unwrap();
        assert_eq!(loaded, Snapshot::default());
    }

    #[tokio::test]
    async fn state_file_with_tmp_extension_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.tmp");

        let h = Harness::new();
        let client = h.client("owner", 3).await;
        h.state.admission.admit(Some(&client.api_key), at(0)).await;

        let snap = Snapshot::capture(&h.registry, &h.ledger).await.unwrap();
        snapshot::save(&path, &snap).await.unwrap();

        assert_eq!(snapshot::load(&path).await.unwrap(), snap);
        assert!(!dir.path().join("state.tmp.tmp").exists());
    }

    #[tokio::test]
    async fn state_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let h = Harness::new();
        let client = h.client("owner", 3).await;
        for secs in 0..2 {
            h.state.admission.admit(Some(&client.api_key), at(secs)).await;
        }

        let snap = Snapshot::capture(&h.registry, &h.ledger).await.unwrap();
        snapshot::save(&path, &snap).await.unwrap();
        let loaded = snapshot::load(&path).await.unwrap();
        assert_eq!(loaded.clients, vec![client.clone()]);
        assert_eq!(loaded.ledger.len(), 1);
        assert_eq!(loaded.ledger[0].count, 2);

        let (registry, ledger) = loaded.into_stores();
        let restored = Harness::with_stores(registry, ledger);

        // counting continues where it left off
        match restored.state.admission.admit(Some(&client.api_key), at(5)).await {
            AdmissionResult::Admitted { remaining, .. } => assert_eq!(remaining, 0),
            other => panic!("expected admission, got {other:?}"),
        }
        assert!(matches!(
            restored.state.admission.admit(Some(&client.api_key), at(6)).await,
            AdmissionResult::RateLimited { .. }
        ));
    }
}
