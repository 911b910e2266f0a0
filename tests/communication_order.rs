use halo_stencil::prelude::*;

fn block() -> ComposedBlock<2, RayonComm> {
    ComposedBlock::with_values(RayonComm::solo(), &BlockConfig::new(4, 2), FieldData::zeros(16))
        .unwrap()
}

#[test]
fn fresh_blocks_have_receives_armed() {
    let mut b = block();
    assert_eq!(b.phase(), CommPhase::ReceivesArmed);
    assert!(b.finish_communication().is_ok());
    assert_eq!(b.receive_done_at(), Err(StencilError::NoOutstandingReceive));
}

#[test]
fn a_second_start_needs_the_first_round_to_finish() {
    let mut b = block();
    b.start_communication().unwrap();
    let err = b.start_communication().unwrap_err();
    assert_eq!(
        err,
        StencilError::CommunicationOrder {
            operation: "start communication",
            phase: "in flight",
        }
    );
    assert!(err.is_precondition_violation());
}

#[test]
fn finishing_early_keeps_the_round_open() {
    let mut b = block();
    b.start_communication().unwrap();
    b.receive_done_at().unwrap();
    b.finish_communication().unwrap();
    assert_eq!(b.phase(), CommPhase::InFlight);
    assert_eq!(b.outstanding_receives(), 3);
    assert!(b.start_communication().is_err());

    for _ in 0..3 {
        b.receive_done_at().unwrap();
    }
    assert_eq!(b.receive_done_at(), Err(StencilError::NoOutstandingReceive));
    b.finish_communication().unwrap();
    assert_eq!(b.phase(), CommPhase::Idle);
    b.start_communication().unwrap();
}

#[test]
fn blocks_without_values_skip_the_exchange() {
    let mut b = ComposedBlock::<2, _>::new(RayonComm::solo(), &BlockConfig::new(4, 2)).unwrap();
    b.start_communication().unwrap();
    assert_eq!(b.outstanding_receives(), 0);
    assert!(matches!(
        b.inner_iterator(ExecutionContext::SERIAL),
        Err(StencilError::MissingValues)
    ));
}

#[test]
fn values_must_fill_the_block() {
    let mut b = block();
    assert_eq!(
        b.set_values(FieldData::zeros(15)),
        Err(StencilError::SizeMismatch { expected: 16, found: 15 })
    );
}

#[test]
fn invalid_configs_are_rejected() {
    assert!(ComposedBlock::<2, _>::new(RayonComm::solo(), &BlockConfig::new(4, 5)).is_err());
    assert!(ComposedBlock::<2, _>::new(RayonComm::solo(), &BlockConfig::new(0, 1)).is_err());
}
