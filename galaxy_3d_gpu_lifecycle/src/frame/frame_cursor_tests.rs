use super::*;

#[test]
fn test_new_cursor_starts_at_frame_zero() {
    let cursor = FrameCursor::new(3).unwrap();
    assert_eq!(cursor.frame_count(), 3);
    assert_eq!(cursor.frame_index(), 0);
    assert_eq!(cursor.free_bin(), 0);
}

#[test]
fn test_new_rejects_invalid_frame_counts() {
    assert!(matches!(FrameCursor::new(0), Err(Error::OutOfRange(_))));
    assert!(matches!(FrameCursor::new(MAX_FRAMES_IN_FLIGHT + 1), Err(Error::OutOfRange(_))));
}

#[test]
fn test_advance_wraps_around() {
    let cursor = FrameCursor::new(3).unwrap();
    assert_eq!(cursor.advance(), 1);
    assert_eq!(cursor.advance(), 2);
    assert_eq!(cursor.advance(), 0);
    assert_eq!(cursor.frame_index(), 0);
}

#[test]
fn test_free_bin_is_independent_of_frame_index() {
    let cursor = FrameCursor::new(2).unwrap();
    cursor.set_free_bin(1);
    cursor.advance();
    cursor.advance();

    assert_eq!(cursor.free_bin(), 1);
    assert_eq!(cursor.frame_index(), 0);
}

#[test]
fn test_single_frame_cursor_stays_at_zero() {
    let cursor = FrameCursor::new(1).unwrap();
    assert_eq!(cursor.advance(), 0);
}
