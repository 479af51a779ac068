//! End-to-end tests for the BF_TX lifecycle.
//!
//! These drive the public API the way the CLI does: parse shipment JSON,
//! construct, sign with a key file, broadcast to a chain, amend, and read
//! everything back from an on-disk database after reopening it.
//!
//! Each test owns its temporary directory and in-memory chain.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use bftx_protocol::crypto::keys::BftxKeypair;
use bftx_protocol::network::{ChainClient, ChainInfo, NetworkError, SubmitReceipt};
use bftx_protocol::storage::{BftxDb, RecordStore, StoreError};
use bftx_protocol::transaction::legacy::LegacyRecord;
use bftx_protocol::transaction::{
    derive_id, verify_record_signature, KeyFileSigner, KeypairSigner, LifecycleState, Record,
    ShipmentContent,
};
use bftx_protocol::{Lifecycle, LifecycleError};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// A chain whose head can be advanced between calls.
struct MemoryChain {
    app_hash: Mutex<Vec<u8>>,
    height: Mutex<u64>,
    committed: Mutex<HashMap<String, Vec<u8>>>,
    submits: Mutex<usize>,
}

impl MemoryChain {
    fn new(app_hash: &[u8]) -> Self {
        Self {
            app_hash: Mutex::new(app_hash.to_vec()),
            height: Mutex::new(1),
            committed: Mutex::new(HashMap::new()),
            submits: Mutex::new(0),
        }
    }

    fn commit_block(&self, app_hash: &[u8]) {
        *self.app_hash.lock() = app_hash.to_vec();
        *self.height.lock() += 1;
    }

    fn submits(&self) -> usize {
        *self.submits.lock()
    }
}

impl ChainClient for MemoryChain {
    fn info(&self) -> Result<ChainInfo, NetworkError> {
        Ok(ChainInfo {
            data: "memory".into(),
            last_block_height: *self.height.lock(),
            last_block_app_hash: self.app_hash.lock().clone(),
        })
    }

    fn submit(&self, tx: &[u8]) -> Result<SubmitReceipt, NetworkError> {
        *self.submits.lock() += 1;
        let record: serde_json::Value =
            serde_json::from_slice(tx).map_err(|e| NetworkError::Decode(e.to_string()))?;
        let id = record["id"].as_str().unwrap_or_default().to_string();
        self.committed.lock().insert(id, tx.to_vec());
        Ok(SubmitReceipt {
            hash: "00FF".into(),
            code: 0,
            log: String::new(),
            data: Vec::new(),
        })
    }

    fn query_by_id(&self, id: &str) -> Result<Option<Vec<u8>>, NetworkError> {
        Ok(self.committed.lock().get(id).cloned())
    }
}

const BILL_OF_LADING: &str = r#"{
    "type": "BF_TX",
    "properties": {
        "shipper": "Acme Freight Pty Ltd",
        "carrier": "Oceanic Lines",
        "consignee": "Harbour Imports",
        "bol_num": 120034,
        "vessel": "MV Southern Cross",
        "port_of_loading": "Sydney",
        "port_of_discharge": "Singapore",
        "gross_weight": 18250,
        "date_shipped": "2017-09-01",
        "issue_details": { "place_of_issue": "Sydney", "date_of_issue": "2017-09-02" },
        "num_bol": 3
    }
}"#;

fn bill() -> ShipmentContent {
    ShipmentContent::from_json(BILL_OF_LADING).expect("fixture parses")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn full_lifecycle_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("db");
    let key_path = dir.path().join("signer.key");
    BftxKeypair::generate().save(&key_path).unwrap();

    let chain = MemoryChain::new(&[0xAA; 32]);
    let id = {
        let lc = Lifecycle::new(
            BftxDb::open(&db_path).unwrap(),
            &chain,
            KeyFileSigner::new(&key_path),
        );
        let id = lc.construct(bill()).unwrap();
        assert_eq!(id, derive_id(&bill().content_hash().unwrap(), &[0xAA; 32]));
        lc.sign(&id).unwrap();
        lc.broadcast(&id).unwrap();
        id
    };

    let lc = Lifecycle::new(
        BftxDb::open(&db_path).unwrap(),
        &chain,
        KeyFileSigner::new(&key_path),
    );
    let record = lc.get(&id).unwrap();
    assert_eq!(record.lifecycle(), LifecycleState::Transmitted);
    verify_record_signature(&record).unwrap();
    assert_eq!(lc.query(&id).unwrap(), record);
    assert_eq!(lc.total().unwrap(), 1);
    assert_eq!(chain.submits(), 1);
}

#[test]
fn same_content_after_new_block_gets_new_id() {
    let chain = MemoryChain::new(&[0x01]);
    let lc = Lifecycle::new(
        BftxDb::open_temporary().unwrap(),
        &chain,
        KeypairSigner::new(BftxKeypair::generate()),
    );

    let first = lc.construct(bill()).unwrap();
    chain.commit_block(&[0x02]);
    let second = lc.construct(bill()).unwrap();

    assert_ne!(first, second);
    assert_eq!(lc.total().unwrap(), 2);
    // The first stored match wins on reverse lookup.
    assert_eq!(lc.verify(&bill()).unwrap(), first);
}

#[test]
fn amendment_chain_is_walkable() {
    let chain = MemoryChain::new(&[0xAA]);
    let lc = Lifecycle::new(
        BftxDb::open_temporary().unwrap(),
        &chain,
        KeypairSigner::new(BftxKeypair::generate()),
    );

    let mut ids = vec![lc.construct(bill()).unwrap()];
    for weight in [18_300u64, 18_420] {
        let mut next = bill();
        next.properties.gross_weight = Some(weight);
        let target = ids.last().cloned().unwrap();
        ids.push(lc.append(next, &target).unwrap());
    }

    let mut walked = vec![ids[0].clone()];
    while let Some(next) = lc.state(walked.last().unwrap()).unwrap().amendment {
        walked.push(next);
    }
    assert_eq!(walked, ids);
    assert_eq!(lc.total().unwrap(), 3);
}

#[test]
fn concurrent_signers_on_one_database_have_one_winner() {
    let chain = Arc::new(MemoryChain::new(&[0xAA]));
    let db = BftxDb::open_temporary().unwrap();
    let id = Lifecycle::new(
        db.clone(),
        chain.as_ref(),
        KeypairSigner::new(BftxKeypair::generate()),
    )
    .construct(bill())
    .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let db = db.clone();
            let chain = Arc::clone(&chain);
            let id = id.clone();
            thread::spawn(move || {
                let lc = Lifecycle::new(
                    db,
                    chain.as_ref(),
                    KeypairSigner::new(BftxKeypair::generate()),
                );
                lc.sign(&id)
            })
        })
        .collect();

    let outcomes: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("signer thread should not panic"))
        .collect();

    let winners = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    for outcome in outcomes.iter().filter(|r| r.is_err()) {
        assert!(matches!(
            outcome,
            Err(LifecycleError::AlreadySigned(_))
                | Err(LifecycleError::Store(StoreError::Conflict(_)))
        ));
    }
    verify_record_signature(&db.get(&id).unwrap().unwrap()).unwrap();
}

#[test]
fn legacy_database_records_are_usable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let draft = Record::draft("ab".repeat(32), bill());

    // Seed the records tree the way the legacy tooling left it.
    {
        let raw = sled::open(dir.path()).unwrap();
        let records = raw.open_tree("records").unwrap();
        let legacy = serde_json::to_vec(&LegacyRecord::from(&draft)).unwrap();
        records.insert(draft.id.as_bytes(), legacy).unwrap();
        raw.flush().unwrap();
    }

    let chain = MemoryChain::new(&[0xAA]);
    let db = BftxDb::open(dir.path()).unwrap();
    let lc = Lifecycle::new(&db, &chain, KeypairSigner::new(BftxKeypair::generate()));

    assert_eq!(lc.get(&draft.id).unwrap(), draft);
    assert_eq!(lc.verify(&bill()).unwrap(), draft.id);
    lc.sign(&draft.id).unwrap();
    lc.broadcast(&draft.id).unwrap();
    assert_eq!(
        lc.get(&draft.id).unwrap().lifecycle(),
        LifecycleState::Transmitted
    );
}
