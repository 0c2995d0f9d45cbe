//! Temporary context keys for a sub-operation.
//!
//! A sub-operation may need extra keys (an order id, a category) without
//! disturbing the request-level keys around it. The functions here install
//! the extras, run the operation, and remove exactly the keys they added --
//! a targeted removal, not a full clear, so `requestId` and friends
//! survive.

use std::future::Future;

use crate::mdc;

/// Removes the listed keys from the current store on drop.
struct ScopedKeys {
    keys: Vec<String>,
}

impl Drop for ScopedKeys {
    fn drop(&mut self) {
        for key in &self.keys {
            mdc::remove(key);
        }
    }
}

/// Runs `op` with `extra` keys installed in the current store, removing
/// exactly those keys afterward -- also when `op` fails or panics.
///
/// Removal-only semantics: if an extra key collides with a pre-existing
/// key, the prior value is overwritten for the duration and removed
/// afterward, not restored.
pub async fn with_keys<I, K, V, F>(extra: I, op: F) -> F::Output
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
    F: Future,
{
    let _cleanup = install_keys(extra);
    op.await
}

/// Synchronous variant of [`with_keys`].
pub fn with_keys_sync<I, K, V, F, T>(extra: I, op: F) -> T
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
    F: FnOnce() -> T,
{
    let _cleanup = install_keys(extra);
    op()
}

fn install_keys<I, K, V>(extra: I) -> ScopedKeys
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut added = Vec::new();
    for (key, value) in extra {
        let key = key.into();
        mdc::put(key.as_str(), value.into());
        added.push(key);
    }
    ScopedKeys { keys: added }
}

#[cfg(test)]
mod tests {
    use std::panic::AssertUnwindSafe;

    use proptest::prelude::*;

    use super::*;
    use crate::mdc::keys;

    #[test]
    fn extras_are_visible_during_and_removed_after() {
        mdc::sync_scope(|| {
            mdc::put(keys::REQUEST_ID, "r-1");

            let result = with_keys_sync(
                [("orderId", "o-7"), ("category", "books")],
                || {
                    assert_eq!(mdc::get("orderId").as_deref(), Some("o-7"));
                    assert_eq!(mdc::get("category").as_deref(), Some("books"));
                    assert_eq!(mdc::get(keys::REQUEST_ID).as_deref(), Some("r-1"));
                    "done"
                },
            );
            assert_eq!(result, "done");

            assert_eq!(mdc::get("orderId"), None);
            assert_eq!(mdc::get("category"), None);
            assert_eq!(mdc::get(keys::REQUEST_ID).as_deref(), Some("r-1"));
        });
    }

    #[tokio::test]
    async fn async_variant_removes_extras() {
        mdc::scope(async {
            mdc::put(keys::REQUEST_ID, "r-1");

            with_keys([("orderId", "o-7")], async {
                tokio::task::yield_now().await;
                assert_eq!(mdc::get("orderId").as_deref(), Some("o-7"));
            })
            .await;

            assert_eq!(mdc::get("orderId"), None);
            assert_eq!(mdc::get(keys::REQUEST_ID).as_deref(), Some("r-1"));
        })
        .await;
    }

    #[test]
    fn extras_are_removed_when_the_operation_panics() {
        mdc::sync_scope(|| {
            mdc::put(keys::REQUEST_ID, "r-1");

            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
                with_keys_sync([("orderId", "o-7")], || {
                    panic!("operation failed");
                })
            }));
            assert!(outcome.is_err());

            assert_eq!(mdc::get("orderId"), None);
            assert_eq!(mdc::get(keys::REQUEST_ID).as_deref(), Some("r-1"));
        });
    }

    #[test]
    fn collision_is_removed_not_restored() {
        // Pins the removal-only contract: a pre-existing value under a
        // colliding key is erased by the cleanup, not restored.
        mdc::sync_scope(|| {
            mdc::put("category", "pre-existing");

            with_keys_sync([("category", "temporary")], || {
                assert_eq!(mdc::get("category").as_deref(), Some("temporary"));
            });

            assert_eq!(mdc::get("category"), None);
        });
    }

    proptest! {
        #[test]
        fn extras_never_outlive_the_operation(
            extra in proptest::collection::btree_map("k[a-z]{0,7}", "[a-z0-9]{0,8}", 0..8)
        ) {
            mdc::sync_scope(|| {
                mdc::put(keys::REQUEST_ID, "r-1");

                with_keys_sync(extra.clone(), || ());

                for key in extra.keys() {
                    prop_assert_eq!(mdc::get(key), None);
                }
                let request_id = mdc::get(keys::REQUEST_ID);
                prop_assert_eq!(request_id.as_deref(), Some("r-1"));
                Ok(())
            })?;
        }
    }
}
