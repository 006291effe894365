use super::ISizeMap;

#[test]
fn index_yields_default_for_missing() {
    let m = ISizeMap::<u32>::new();
    assert_eq!(m[5], 0);
    assert!(m.is_empty());
}

#[test]
fn index_mut_grows_both_directions() {
    let mut m = ISizeMap::new();
    m[2] = 10;
    m[-3] = 20;
    assert_eq!(m[2], 10);
    assert_eq!(m[-3], 20);
    assert_eq!(m[0], 0);
    assert_eq!(m.len(), 6);
    assert_eq!(m.end_index(), 3);
}

#[test]
fn get_mut_in_range_only() {
    let mut m = ISizeMap::new();
    m[1] = 5;
    assert_eq!(m.get_mut(1), Some(&mut 5));
    assert_eq!(m.get_mut(2), None);
}
