mod common;

use common::{anchored, parse, TestSigner};
use did_sidetree::{
    commitment, create_existing, deactivate, jws, recover_existing, update, AnchorPoint,
    AnchoredOperation, DIDStatePatch, DIDSuffix, Delta, Operation, PartiallyVerifiedOperation,
    Resolution, ServiceEndpoint, ServiceEndpointEntry, Signer, UpdateClaims, UpdateOperation,
    DIDION, ION,
};
use pretty_assertions::assert_eq;

fn add_service(id: &str, endpoint: &str) -> DIDStatePatch {
    DIDStatePatch::AddServices {
        services: vec![ServiceEndpointEntry {
            id: id.to_string(),
            r#type: "LinkedDomains".to_string(),
            service_endpoint: ServiceEndpoint::Uri(endpoint.to_string()),
        }],
    }
}

struct Keys {
    update0: TestSigner,
    update1: TestSigner,
    update2: TestSigner,
    recovery0: TestSigner,
    recovery1: TestSigner,
}

impl Keys {
    fn new() -> Self {
        Self {
            update0: TestSigner::from_seed(10),
            update1: TestSigner::from_seed(11),
            update2: TestSigner::from_seed(12),
            recovery0: TestSigner::from_seed(20),
            recovery1: TestSigner::from_seed(21),
        }
    }

    fn create(&self) -> PartiallyVerifiedOperation {
        parse(
            &create_existing::<ION>(
                &self.update0.public_key(),
                &self.recovery0.public_key(),
                vec![],
            )
            .unwrap(),
        )
    }
}

#[test_log::test]
fn create_update_recover_deactivate() {
    let keys = Keys::new();
    let create = keys.create();
    let suffix = create.did_suffix().clone();
    let resolver = DIDION::new();

    let update_op = parse(
        &update::<ION>(
            suffix.clone(),
            &keys.update0,
            &keys.update1.public_key(),
            vec![add_service("domain", "https://example.com")],
        )
        .unwrap(),
    );
    let after_update = resolver.resolve(&suffix, vec![anchored(1, &create), anchored(2, &update_op)]);
    let state = after_update.state().unwrap();
    assert!(state.document.service("domain").is_some());
    assert_eq!(
        state.update_commitment,
        Some(commitment::commit::<ION>(&keys.update1.public_key()).unwrap())
    );

    let recover_op = parse(
        &recover_existing::<ION>(
            suffix.clone(),
            &keys.recovery0,
            &keys.update2.public_key(),
            &keys.recovery1.public_key(),
            vec![],
        )
        .unwrap(),
    );
    let mut operations = vec![
        anchored(1, &create),
        anchored(2, &update_op),
        anchored(3, &recover_op),
    ];
    let after_recover = resolver.resolve(&suffix, operations.clone());
    let state = after_recover.state().unwrap();
    assert_eq!(
        state.recovery_commitment,
        Some(commitment::commit::<ION>(&keys.recovery1.public_key()).unwrap())
    );
    assert!(state.document.service("domain").is_some());

    let deactivate_op = parse(&deactivate::<ION>(suffix.clone(), &keys.recovery1).unwrap());
    operations.push(anchored(4, &deactivate_op));
    let resolution = resolver.resolve(&suffix, operations);
    assert!(resolution.is_deactivated());
    let state = resolution.state().unwrap();
    assert!(state.document.is_empty());
    assert_eq!(state.recovery_commitment, None);
    assert_eq!(state.update_commitment, None);
}

#[test_log::test]
fn earlier_anchor_wins_fork_in_any_order() {
    let keys = Keys::new();
    let create = keys.create();
    let suffix = create.did_suffix().clone();

    let first = parse(
        &update::<ION>(
            suffix.clone(),
            &keys.update0,
            &keys.update1.public_key(),
            vec![add_service("first", "https://first.example")],
        )
        .unwrap(),
    );
    let second = parse(
        &update::<ION>(
            suffix.clone(),
            &keys.update0,
            &keys.update2.public_key(),
            vec![add_service("second", "https://second.example")],
        )
        .unwrap(),
    );

    let resolver = DIDION::new();
    let in_order = resolver.resolve(
        &suffix,
        vec![anchored(1, &create), anchored(2, &first), anchored(3, &second)],
    );
    let reversed = resolver.resolve(
        &suffix,
        vec![anchored(3, &second), anchored(2, &first), anchored(1, &create)],
    );
    assert_eq!(in_order, reversed);
    let state = in_order.state().unwrap();
    assert!(state.document.service("first").is_some());
    assert!(state.document.service("second").is_none());
    assert_eq!(state.last_operation_hash, first.operation_hash());
}

#[test_log::test]
fn nothing_applies_after_deactivation() {
    let keys = Keys::new();
    let create = keys.create();
    let suffix = create.did_suffix().clone();
    let deactivate_op = parse(&deactivate::<ION>(suffix.clone(), &keys.recovery0).unwrap());
    let late_update = parse(
        &update::<ION>(
            suffix.clone(),
            &keys.update0,
            &keys.update1.public_key(),
            vec![add_service("late", "https://late.example")],
        )
        .unwrap(),
    );
    let late_recover = parse(
        &recover_existing::<ION>(
            suffix.clone(),
            &keys.recovery0,
            &keys.update1.public_key(),
            &keys.recovery1.public_key(),
            vec![],
        )
        .unwrap(),
    );

    let resolver = DIDION::new();
    let deactivated = resolver.resolve(
        &suffix,
        vec![anchored(1, &create), anchored(2, &deactivate_op)],
    );
    for late in [&late_update, &late_recover, &create] {
        let resolution = resolver.resolve(
            &suffix,
            vec![anchored(1, &create), anchored(2, &deactivate_op), anchored(5, late)],
        );
        assert_eq!(resolution, deactivated);
    }
}

#[test_log::test]
fn wrong_reveal_leaves_state_unchanged() {
    let keys = Keys::new();
    let create = keys.create();
    let suffix = create.did_suffix().clone();
    // Signed by a key the DID never committed to.
    let stranger = TestSigner::from_seed(99);
    let forged = parse(
        &update::<ION>(
            suffix.clone(),
            &stranger,
            &keys.update1.public_key(),
            vec![add_service("forged", "https://forged.example")],
        )
        .unwrap(),
    );
    let resolver = DIDION::new();
    let before = resolver.resolve(&suffix, vec![anchored(1, &create)]);
    let after = resolver.resolve(&suffix, vec![anchored(1, &create), anchored(2, &forged)]);
    assert_eq!(before, after);
}

#[test_log::test]
fn update_key_cannot_recover() {
    let keys = Keys::new();
    let create = keys.create();
    let suffix = create.did_suffix().clone();
    let recover_op = parse(
        &recover_existing::<ION>(
            suffix.clone(),
            &keys.update0,
            &keys.update1.public_key(),
            &keys.recovery1.public_key(),
            vec![],
        )
        .unwrap(),
    );
    let resolver = DIDION::new();
    let resolution = resolver.resolve(&suffix, vec![anchored(1, &create), anchored(2, &recover_op)]);
    assert_eq!(
        resolution.state().unwrap().last_operation_hash,
        create.operation_hash()
    );
}

/// Update signed by `signer` whose delta commits to the signer's own key again.
fn update_keeping_key(
    suffix: &DIDSuffix,
    signer: &TestSigner,
    patches: Vec<DIDStatePatch>,
) -> PartiallyVerifiedOperation {
    let update_key = signer.public_key();
    let delta = Delta {
        patches,
        update_commitment: commitment::commit::<ION>(&update_key).unwrap(),
    };
    let claims = UpdateClaims {
        delta_hash: delta.hash::<ION>().unwrap(),
        update_key: update_key.clone(),
    };
    parse(&Operation::Update(UpdateOperation {
        did_suffix: suffix.clone(),
        reveal_value: commitment::reveal_value::<ION>(&update_key).unwrap(),
        delta,
        signed_data: jws::encode_sign::<ION, _>(&claims, signer).unwrap(),
    }))
}

#[test_log::test]
fn revealed_update_key_cannot_be_recommitted() {
    let keys = Keys::new();
    let create = keys.create();
    let suffix = create.did_suffix().clone();
    let replay_a = update_keeping_key(
        &suffix,
        &keys.update0,
        vec![add_service("a", "https://a.example")],
    );
    let replay_b = update_keeping_key(
        &suffix,
        &keys.update0,
        vec![add_service("b", "https://b.example")],
    );
    let resolution = DIDION::new().resolve(
        &suffix,
        vec![anchored(1, &create), anchored(2, &replay_a), anchored(3, &replay_b)],
    );
    let state = resolution.state().unwrap();
    assert!(state.document.services.is_empty());
    assert_eq!(state.last_operation_hash, create.operation_hash());
    assert_eq!(state.update_commitment.as_deref(), create.update_commitment());
}

#[test_log::test]
fn same_transaction_orders_by_number() {
    let keys = Keys::new();
    let create = keys.create();
    let suffix = create.did_suffix().clone();
    let later = parse(
        &update::<ION>(
            suffix.clone(),
            &keys.update0,
            &keys.update1.public_key(),
            vec![add_service("later", "https://later.example")],
        )
        .unwrap(),
    );
    let earlier = parse(
        &update::<ION>(
            suffix.clone(),
            &keys.update0,
            &keys.update2.public_key(),
            vec![add_service("earlier", "https://earlier.example")],
        )
        .unwrap(),
    );
    let resolution = DIDION::new().resolve(
        &suffix,
        vec![
            anchored(1, &create),
            AnchoredOperation::new(AnchorPoint::new(2, 7), later),
            AnchoredOperation::new(AnchorPoint::new(2, 3), earlier.clone()),
        ],
    );
    assert_eq!(
        resolution.state().unwrap().last_operation_hash,
        earlier.operation_hash()
    );
}

#[test_log::test]
fn unknown_suffix_is_unseen() {
    let keys = Keys::new();
    let create = keys.create();
    let other = Keys {
        update0: TestSigner::from_seed(30),
        ..Keys::new()
    }
    .create();
    assert_ne!(create.did_suffix(), other.did_suffix());
    let resolution = DIDION::new().resolve(other.did_suffix(), vec![anchored(1, &create)]);
    assert_eq!(resolution, Resolution::Unseen);
}
