use smartstring::alias::String as SmartString;
use crate::unicount::char_slice;
use super::Operation;
use super::Operation::*;

/// Transform `op` by `other`. Both operations must apply to the same document state. Returns a
/// version of `op` which applies to the document after `other` has been applied.
///
/// If both operations insert at the same position, `op_first` decides which insert ends up
/// first. The two sides of a concurrent pair must pass opposite values, otherwise the replicas
/// diverge.
///
/// For any `a`, `b` and `doc`:
///
/// ```text
/// apply(apply(doc, a), transform(b, a, !f)) == apply(apply(doc, b), transform(a, b, f))
/// ```
///
/// Components which cancel out (eg an insert followed by a delete of the same text) are still
/// transformed step by step. Skipping them would produce the wrong positions for whatever they're
/// being transformed against.
pub fn transform(op: &Operation, other: &Operation, op_first: bool) -> Operation {
    match (op, other) {
        (NoOperation, _) => NoOperation,
        (_, NoOperation) => op.clone(),

        (Split(a, b), _) => {
            let a2 = transform(a, other, op_first);
            let other2 = transform(other, a, !op_first);
            let b2 = transform(b, &other2, op_first);
            Operation::new_split(a2, b2)
        }
        (_, Split(a, b)) => {
            let op2 = transform(op, a, op_first);
            transform(&op2, b, op_first)
        }

        // Empty inserts and deletes don't do anything. They also don't have a meaningful length,
        // which the cases below rely on.
        _ if op.is_noop() => NoOperation,
        _ if other.is_noop() => op.clone(),

        (Insert { pos: p1, content }, Insert { pos: p2, .. }) => {
            if *p1 < *p2 || (*p1 == *p2 && op_first) {
                op.clone()
            } else {
                Insert { pos: p1 + other.content_len(), content: content.clone() }
            }
        }

        (Insert { pos: p1, content }, Delete { pos: p2, .. }) => {
            let del_end = p2 + other.content_len();
            if *p1 <= *p2 {
                op.clone()
            } else if *p1 >= del_end {
                Insert { pos: p1 - other.content_len(), content: content.clone() }
            } else {
                // The text around our insert was deleted. Insert where the deleted text was.
                Insert { pos: *p2, content: content.clone() }
            }
        }

        (Delete { pos: p1, content }, Insert { pos: p2, .. }) => {
            let len = op.content_len();
            let ins_len = other.content_len();
            if *p2 <= *p1 {
                Delete { pos: p1 + ins_len, content: content.clone() }
            } else if *p2 >= p1 + len {
                op.clone()
            } else {
                // The insert lands inside the range we're deleting. Delete around it.
                let split = p2 - p1;
                Operation::new_split(
                    Operation::new_delete(*p1, char_slice(content, 0, split)),
                    Operation::new_delete(p1 + ins_len, char_slice(content, split, len)),
                )
            }
        }

        (Delete { pos: p1, content }, Delete { pos: p2, .. }) => {
            let len = op.content_len();
            let other_len = other.content_len();
            let (end1, end2) = (p1 + len, p2 + other_len);

            if end1 <= *p2 {
                op.clone()
            } else if end2 <= *p1 {
                Delete { pos: p1 - other_len, content: content.clone() }
            } else {
                // Overlapping. Only delete what the other side left behind.
                let mut remaining = SmartString::new();
                if p1 < p2 {
                    remaining.push_str(char_slice(content, 0, p2 - p1));
                }
                if end2 < end1 {
                    remaining.push_str(char_slice(content, end2 - p1, len));
                }

                if remaining.is_empty() {
                    NoOperation
                } else {
                    Delete { pos: *p1.min(p2), content: remaining }
                }
            }
        }

        // Splits and no-ops are handled above.
        _ => unreachable!(),
    }
}
