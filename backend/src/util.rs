// Runs a fallible operation, retrying up to `retries` additional times on
// failure, and returns the last result.
pub fn retry<T, E, F>(retries: u32, f: F) -> Result<T, E>
where
    F: Fn() -> Result<T, E>,
{
    let mut result = f();
    for _ in 0..retries {
        if result.is_ok() {
            break;
        }
        result = f();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_retries_until_success() {
        let attempts = Cell::new(0);
        let result: Result<u32, ()> = retry(2, || {
            attempts.set(attempts.get() + 1);
            if attempts.get() < 2 {
                Err(())
            } else {
                Ok(attempts.get())
            }
        });
        assert_eq!(result, Ok(2));
    }

    #[test]
    fn test_gives_up_after_the_last_retry() {
        let attempts = Cell::new(0);
        let result: Result<u32, u32> = retry(1, || {
            attempts.set(attempts.get() + 1);
            Err(attempts.get())
        });
        assert_eq!(result, Err(2));
    }
}
