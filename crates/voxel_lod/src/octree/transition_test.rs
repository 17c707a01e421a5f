use super::*;

fn id(i: usize) -> NodeId {
  NodeId::from_index(i)
}

// =========================================================================
// Batch 5: TransitionCell Tests
// =========================================================================

#[test]
fn test_new_cell_is_disabled_and_empty() {
  let cell = TransitionCell::new(Face::PosY);
  assert_eq!(cell.direction, Face::PosY);
  assert!(!cell.enabled);
  assert_eq!(cell.adjacent_node_index, 0);
  assert!(!cell.is_complete());
}

/// Four distinct quadrants make a complete cell.
#[test]
fn test_attach_fills_quadrants() {
  let mut cell = TransitionCell::new(Face::PosX);
  for q in 0..4 {
    assert!(cell.attach(q, id(10 + q)));
  }
  assert!(cell.enabled);
  assert!(cell.is_complete());
  assert_eq!(
    cell.stitch_partners(id(1)).unwrap(),
    Some([id(10), id(11), id(12), id(13)])
  );
}

/// Attaching the same node twice must not inflate the count.
#[test]
fn test_attach_is_idempotent() {
  let mut cell = TransitionCell::new(Face::NegZ);
  assert!(cell.attach(2, id(5)));
  assert!(cell.attach(2, id(5)));
  assert_eq!(cell.adjacent_node_index, 1);
  assert!(!cell.attach(2, id(6)));
  assert_eq!(cell.adjacent_nodes[2], Some(id(5)));
  assert!(!cell.attach(4, id(7)));
}

#[test]
fn test_incomplete_cell_reports_error() {
  let mut cell = TransitionCell::new(Face::NegX);
  cell.attach(0, id(3));
  cell.attach(3, id(4));
  let err = cell.stitch_partners(id(9)).unwrap_err();
  assert_eq!(
    err,
    VoxelError::IncompleteTransitionCell {
      node: id(9),
      direction: Face::NegX,
      filled: 2
    }
  );
}

#[test]
fn test_disabled_cell_has_no_partners() {
  let cell = TransitionCell::new(Face::PosZ);
  assert_eq!(cell.stitch_partners(id(0)).unwrap(), None);
}

#[test]
fn test_clear_keeps_direction() {
  let mut cell = TransitionCell::new(Face::NegY);
  cell.attach(1, id(2));
  cell.clear();
  assert_eq!(cell, TransitionCell::new(Face::NegY));
}
