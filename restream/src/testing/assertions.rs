//! Assertions for what a [`CollectingConsumer`] received.

use std::fmt::Debug;

use super::CollectingConsumer;

/// Asserts that the consumer received exactly `expected`, in order.
pub fn assert_items<T, E>(consumer: &CollectingConsumer<T, E>, expected: &[T])
where
    T: Clone + Debug + PartialEq,
    E: Clone,
{
    let actual = consumer.items();
    assert_eq!(
        actual.as_slice(),
        expected,
        "Expected items {expected:?}, got {actual:?}"
    );
}

/// Asserts that the consumer completed exactly once, successfully.
pub fn assert_finished<T, E>(consumer: &CollectingConsumer<T, E>)
where
    T: Clone,
    E: Clone + Debug,
{
    let count = consumer.completion_count();
    assert_eq!(count, 1, "Expected exactly one completion, got {count}");
    let completion = consumer.completion();
    assert!(
        consumer.is_finished(),
        "Expected finished, got {completion:?}"
    );
}

/// Asserts that the consumer failed exactly once with `expected`.
pub fn assert_failed_with<T, E>(consumer: &CollectingConsumer<T, E>, expected: &E)
where
    T: Clone,
    E: Clone + Debug + PartialEq,
{
    let count = consumer.completion_count();
    assert_eq!(count, 1, "Expected exactly one completion, got {count}");
    let failure = consumer.failure();
    let completion = consumer.completion();
    assert_eq!(
        failure.as_ref(),
        Some(expected),
        "Expected failure {expected:?}, got {completion:?}"
    );
}

/// Asserts that the consumer has not received any completion.
pub fn assert_not_completed<T, E>(consumer: &CollectingConsumer<T, E>)
where
    T: Clone,
    E: Clone + Debug,
{
    let completion = consumer.completion();
    assert!(
        consumer.completion_count() == 0,
        "Expected no completion, got {completion:?}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Completion;
    use crate::flow::Consumer;

    #[test]
    fn test_assert_items() {
        let consumer = CollectingConsumer::<i32, String>::new();
        consumer.on_item_received(1);
        consumer.on_item_received(2);
        assert_items(&consumer, &[1, 2]);
    }

    #[test]
    #[should_panic(expected = "Expected items")]
    fn test_assert_items_fails() {
        let consumer = CollectingConsumer::<i32, String>::new();
        consumer.on_item_received(1);
        assert_items(&consumer, &[2]);
    }

    #[test]
    fn test_assert_finished() {
        let consumer = CollectingConsumer::<i32, String>::new();
        consumer.on_completion(Completion::Finished);
        assert_finished(&consumer);
    }

    #[test]
    #[should_panic(expected = "Expected finished")]
    fn test_assert_finished_fails_on_failure() {
        let consumer = CollectingConsumer::<i32, String>::new();
        consumer.on_completion(Completion::Failed("boom".to_string()));
        assert_finished(&consumer);
    }

    #[test]
    fn test_assert_failed_with() {
        let consumer = CollectingConsumer::<i32, String>::new();
        consumer.on_completion(Completion::Failed("boom".to_string()));
        assert_failed_with(&consumer, &"boom".to_string());
    }

    #[test]
    #[should_panic(expected = "Expected exactly one completion")]
    fn test_assert_failed_with_rejects_double_delivery() {
        let consumer = CollectingConsumer::<i32, String>::new();
        consumer.on_completion(Completion::Failed("boom".to_string()));
        consumer.on_completion(Completion::Failed("boom".to_string()));
        assert_failed_with(&consumer, &"boom".to_string());
    }

    #[test]
    fn test_assert_not_completed() {
        let consumer = CollectingConsumer::<i32, String>::new();
        assert_not_completed(&consumer);
    }
}
