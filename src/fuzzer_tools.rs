use rand::prelude::*;
use crate::Operation;
use crate::unicount::{char_slice, count_chars};

const USE_UNICODE: bool = true;

const UCHARS: [char; 23] = [
    'a', 'b', 'c', '1', '2', '3', ' ', '\n', // ASCII
    '©', '¥', '½', // The Latin-1 suppliment (U+80 - U+ff)
    'Ύ', 'Δ', 'δ', 'Ϡ', // Greek (U+0370 - U+03FF)
    '←', '↯', '↻', '⇈', // Arrows (U+2190 – U+21FF)
    '𐆐', '𐆔', '𐆘', '𐆚', // Ancient roman symbols (U+10190 – U+101CF)
];

pub(crate) fn random_str(len: usize, rng: &mut SmallRng) -> String {
    let mut str = String::new();
    let alphabet: Vec<char> = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_".chars().collect();

    for _ in 0..len {
        let charset = if USE_UNICODE { &UCHARS[..] } else { &alphabet };
        str.push(charset[rng.gen_range(0..charset.len())]);
    }
    str
}

/// Make a random operation which is valid to apply to `doc`.
pub(crate) fn random_op(doc: &str, rng: &mut SmallRng) -> Operation {
    let doc_len = count_chars(doc);

    match rng.gen_range(0..20) {
        0 => Operation::NoOperation,
        1 => {
            // Type something and immediately delete it again.
            let pos = rng.gen_range(0..=doc_len);
            let content = random_str(rng.gen_range(1..3), rng);
            Operation::new_split(
                Operation::new_insert(pos, &content),
                Operation::new_delete(pos, &content),
            )
        }
        2..=4 if doc_len > 0 => {
            // Replace.
            let pos = rng.gen_range(0..doc_len);
            let span = rng.gen_range(1..=usize::min(5, doc_len - pos));
            let content = random_str(rng.gen_range(1..4), rng);
            Operation::from_replace(pos, char_slice(doc, pos, pos + span), &content)
        }
        5..=11 if doc_len > 0 => {
            let pos = rng.gen_range(0..doc_len);
            let span = rng.gen_range(1..=usize::min(10, doc_len - pos));
            Operation::new_delete(pos, char_slice(doc, pos, pos + span))
        }
        _ => {
            let pos = rng.gen_range(0..=doc_len);
            let len = rng.gen_range(1..4);
            Operation::new_insert(pos, &random_str(len, rng))
        }
    }
}
