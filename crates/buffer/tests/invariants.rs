//! Property tests driving random operation sequences against the
//! buffer's structural invariants.

use proptest::prelude::*;

use termline_buffer::{ConsoleBuffer, DeleteDirection, WriteMode};

#[derive(Debug, Clone)]
enum Op {
    Write(String, WriteMode),
    WriteLine(String, WriteMode),
    Delete(usize, DeleteDirection),
    SetCursor(usize, usize),
    MoveCursor(isize),
    ResizeWidth(usize),
    ResizeHeight(usize),
    Clear,
    Refresh,
    SuspendResume,
}

fn mode_strategy() -> impl Strategy<Value = WriteMode> {
    prop_oneof![Just(WriteMode::Shift), Just(WriteMode::Overwrite)]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let text = "[a-c \\r\\n]{0,24}";
    prop_oneof![
        (text, mode_strategy()).prop_map(|(t, m)| Op::Write(t, m)),
        (text, mode_strategy()).prop_map(|(t, m)| Op::WriteLine(t, m)),
        (0usize..40, prop_oneof![
            Just(DeleteDirection::Left),
            Just(DeleteDirection::Right)
        ])
            .prop_map(|(n, d)| Op::Delete(n, d)),
        (0usize..64, 0usize..64).prop_map(|(r, c)| Op::SetCursor(r, c)),
        (-60isize..60).prop_map(Op::MoveCursor),
        (2usize..24).prop_map(Op::ResizeWidth),
        (2usize..8).prop_map(Op::ResizeHeight),
        Just(Op::Clear),
        Just(Op::Refresh),
        Just(Op::SuspendResume),
    ]
}

fn apply(console: &mut ConsoleBuffer, op: Op) {
    match op {
        Op::Write(text, mode) => console.write(&text, mode),
        Op::WriteLine(text, mode) => console.write_line(&text, mode),
        Op::Delete(count, direction) => console.delete(count, direction),
        Op::SetCursor(row, column) => {
            // Aim inside the current bounds; a valid target must land.
            // Apply any pending reflow first so the bounds are final.
            console.refresh();
            let row = row % console.row_count();
            let row_len = console.row_text(row).map_or(0, |t| t.chars().count());
            let column = column % (row_len + 1);
            console.set_cursor(row, column).expect("target in bounds");
        }
        Op::MoveCursor(delta) => console.move_cursor_by(delta),
        Op::ResizeWidth(width) => console.resize(Some(width), None).expect("above the floor"),
        Op::ResizeHeight(height) => console.resize(None, Some(height)).expect("above the floor"),
        Op::Clear => console.clear(),
        Op::Refresh => console.refresh(),
        Op::SuspendResume => {
            if console.events_suspended() {
                console.resume_events();
            } else {
                console.suspend_events();
            }
        }
    }
}

fn assert_invariants(console: &ConsoleBuffer) {
    let rows = console.row_count();
    assert!(rows >= 1, "buffer never empties");
    assert!(
        rows <= console.height(),
        "row count {} exceeds height {}",
        rows,
        console.height()
    );

    let cursor_row = console.cursor_row();
    assert!(cursor_row < rows, "cursor row {} of {} rows", cursor_row, rows);
    let row_len = console
        .row_text(cursor_row)
        .map_or(0, |t| t.chars().count());
    assert!(
        console.cursor_column() <= row_len,
        "cursor column {} past row length {}",
        console.cursor_column(),
        row_len
    );

    for (index, text) in console.row_texts().enumerate() {
        let len = text.chars().count();
        assert!(
            len <= console.width(),
            "row {} holds {} chars at width {}",
            index,
            len,
            console.width()
        );
    }

    // The cursor's logical line is addressable and contains the cursor.
    let line = console.current_row_text();
    assert!(console.logical_cursor_column() <= line.chars().count());
    assert!(console.logical_line_start() <= cursor_row);
}

proptest! {
    #[test]
    fn random_operations_preserve_invariants(
        width in 2usize..30,
        height in 2usize..8,
        ops in prop::collection::vec(op_strategy(), 0..40),
    ) {
        let mut console = ConsoleBuffer::new(width, height).expect("valid dimensions");
        assert_invariants(&console);
        for op in ops {
            apply(&mut console, op);
            assert_invariants(&console);
        }
        console.resume_events();
        console.refresh();
        assert_invariants(&console);
    }

    #[test]
    fn cursor_position_is_always_settable(
        width in 2usize..20,
        height in 2usize..6,
        ops in prop::collection::vec(op_strategy(), 0..24),
    ) {
        let mut console = ConsoleBuffer::new(width, height).expect("valid dimensions");
        for op in ops {
            apply(&mut console, op);
            // The buffer's own cursor must satisfy its own bounds check.
            console.refresh();
            let (row, column) = (console.cursor_row(), console.cursor_column());
            console.set_cursor(row, column).expect("cursor self-consistent");
        }
    }
}
