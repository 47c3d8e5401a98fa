use thiserror::Error;

use crate::task::{Job, Task};

/// A path failed to parse into a job. Carries enough detail to build a
/// useful message without multiplying the taxonomy the core cares about:
/// every variant here is the single `ParseError` of spec section 4.1.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("path is empty")]
    Empty,
    #[error("path has a leading slash: {path}")]
    LeadingSlash { path: String },
    #[error("path has a trailing slash: {path}")]
    TrailingSlash { path: String },
    #[error("path contains an empty segment: {path}")]
    EmptySegment { path: String },
    #[error("path tail is not a whole number of task triples: {path}")]
    WrongArity { path: String },
}

/// Parse a request path into a level-of-analysis and an ordered task list.
///
/// Grammar: `LOA ( "/" SEG "/" SEG "/" SEG )+`, one leading segment
/// followed by one or more triples. Empty leading slash, trailing slash, or
/// a non-triple tail is a [`ParseError`].
pub fn parse(path: &str) -> Result<Job, ParseError> {
    if path.is_empty() {
        return Err(ParseError::Empty);
    }
    if path.starts_with('/') {
        return Err(ParseError::LeadingSlash { path: path.to_string() });
    }
    if path.ends_with('/') {
        return Err(ParseError::TrailingSlash { path: path.to_string() });
    }

    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(ParseError::EmptySegment { path: path.to_string() });
    }

    let (loa, tail) = segments.split_first().expect("non-empty path has at least one segment");
    if tail.is_empty() || tail.len() % 3 != 0 {
        return Err(ParseError::WrongArity { path: path.to_string() });
    }

    let tasks = tail
        .chunks(3)
        .map(|chunk| Task::new(chunk[0], chunk[1], chunk[2]))
        .collect();

    Ok(Job::new(*loa, tasks))
}

/// Render a `(loa, tasks)` pair as its canonical path. Left inverse of
/// [`parse`]: `render(parse(p)) == p` for any parseable `p`.
pub fn render(loa: &str, tasks: &[Task]) -> String {
    Job::new(loa, tasks.to_vec()).render()
}

/// Parse `path` and return its subjob chain, leaf first, root last.
///
/// Equivalent to `parse(path).map(|job| job.chain())`, exposed directly
/// since the dispatcher and handler only ever need the chain, not the
/// parsed job itself.
pub fn chain(path: &str) -> Result<Vec<String>, ParseError> {
    parse(path).map(|job| job.chain())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_two_task_path() {
        let path = "foo/a/b/c/1/2/3";
        let job = parse(path).expect("should parse");
        assert_eq!(render(&job.loa, &job.tasks), path);
    }

    #[test]
    fn round_trips_a_one_task_path() {
        let path = "foo/x/y/z";
        let job = parse(path).expect("should parse");
        assert_eq!(render(&job.loa, &job.tasks), path);
    }

    #[test]
    fn chain_length_matches_task_count() {
        let path = "foo/a/b/c/1/2/3/x/y/z";
        let chain = chain(path).expect("should parse");
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn chain_is_leaf_first_root_last() {
        let path = "foo/a/b/c/1/2/3";
        let chain = chain(path).expect("should parse");
        assert_eq!(chain, vec!["foo/1/2/3".to_string(), "foo/a/b/c/1/2/3".to_string()]);
    }

    #[test]
    fn chain_monotonicity_each_element_is_a_suffix_of_the_next() {
        let path = "foo/a/b/c/1/2/3/x/y/z";
        let chain = chain(path).expect("should parse");
        for pair in chain.windows(2) {
            let (shorter, longer) = (&pair[0], &pair[1]);
            assert!(longer.ends_with(shorter.as_str()));
        }
    }

    #[test]
    fn one_task_chain_leaf_and_root_coincide() {
        let path = "foo/x/y/z";
        let chain = chain(path).expect("should parse");
        assert_eq!(chain, vec![path.to_string()]);
    }

    #[test]
    fn rejects_empty_path() {
        assert_eq!(parse(""), Err(ParseError::Empty));
    }

    #[test]
    fn rejects_leading_slash() {
        assert!(matches!(parse("/foo/a/b/c"), Err(ParseError::LeadingSlash { .. })));
    }

    #[test]
    fn rejects_trailing_slash() {
        assert!(matches!(parse("foo/a/b/c/"), Err(ParseError::TrailingSlash { .. })));
    }

    #[test]
    fn rejects_mis_arity_tail() {
        // "foo/a/b" has a two-segment tail, not a whole number of triples.
        assert!(matches!(parse("foo/a/b"), Err(ParseError::WrongArity { .. })));
    }

    #[test]
    fn rejects_bare_loa_with_no_tasks() {
        assert!(matches!(parse("foo"), Err(ParseError::WrongArity { .. })));
    }

    #[test]
    fn rejects_doubled_slash_as_empty_segment() {
        assert!(matches!(parse("foo//b/c"), Err(ParseError::EmptySegment { .. })));
    }
}
