use super::*;

#[test]
fn test_edge_table_homogeneous() {
  assert_eq!(EDGE_TABLE[0], 0, "All solid should have no edges");
  assert_eq!(EDGE_TABLE[255], 0, "All empty should have no edges");
  assert_eq!(TRI_TABLE[0][0], -1);
  assert_eq!(TRI_TABLE[255][0], -1);
}

#[test]
fn test_edge_table_single_corner() {
  for corner in 0..8 {
    let mask = 1usize << corner;
    assert_eq!(
      EDGE_TABLE[mask].count_ones(),
      3,
      "Corner {} should cross 3 edges",
      corner
    );
  }
}

#[test]
fn test_edge_table_symmetry() {
  for i in 0..128 {
    assert_eq!(EDGE_TABLE[i], EDGE_TABLE[255 - i]);
  }
}

/// Every edge a triangle references must be flagged in the edge mask.
#[test]
fn test_tri_table_matches_edge_table() {
  for config in 0..256 {
    let row = &TRI_TABLE[config];
    let mut count = 0;
    while count < 16 && row[count] != -1 {
      let edge = row[count] as usize;
      assert!(edge < 12);
      assert!(
        EDGE_TABLE[config] & (1 << edge) != 0,
        "config {} uses unflagged edge {}",
        config,
        edge
      );
      count += 1;
    }
    assert_eq!(count % 3, 0, "config {} has a partial triangle", config);
    assert!(count / 3 <= MAX_TRIANGLES_PER_CELL);
  }
}

#[test]
fn test_edge_connections_are_unit_edges() {
  for [a, b] in EDGE_CONNECTIONS {
    let pa = CORNER_OFFSETS[a];
    let pb = CORNER_OFFSETS[b];
    let diff: usize = (0..3).map(|k| pa[k].abs_diff(pb[k])).sum();
    assert_eq!(diff, 1, "edge {}-{} is not axis aligned", a, b);
  }
}

#[test]
fn test_cube_index_bits() {
  let mut values = [1.0f32; 8];
  assert_eq!(cube_index(&values, 0.5), 0);
  values[3] = 0.0;
  assert_eq!(cube_index(&values, 0.5), 1 << 3);
  // Exactly on the iso level counts as solid.
  values[3] = 0.5;
  assert_eq!(cube_index(&values, 0.5), 0);
  assert_eq!(cube_index(&[0.0; 8], 0.5), 255);
}
