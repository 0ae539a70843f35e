use crate::Result;
use futures_util::future::BoxFuture;
use mongodb::{Client, ClientSession};

/// Runs `f` inside a transaction on a fresh session.
///
/// The transaction is committed when `f` succeeds and aborted when it fails; the
/// error from `f` is returned either way.
///
/// ```ignore
/// let user = mongox::transaction(&client, |session| {
///     Box::pin(async move {
///         users.creator().session(&mut *session).insert_one(&mut user).await?;
///         accounts.updater().session(session).filter(filter).updates(updates).update_one().await?;
///         Ok(user)
///     })
/// })
/// .await?;
/// ```
pub async fn transaction<R, F>(client: &Client, f: F) -> Result<R>
where
    F: for<'s> FnOnce(&'s mut ClientSession) -> BoxFuture<'s, Result<R>>,
{
    let mut session = client.start_session().await?;
    session.start_transaction().await?;

    match f(&mut session).await {
        Ok(value) => {
            session.commit_transaction().await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(abort_error) = session.abort_transaction().await {
                tracing::warn!(%abort_error, "failed to abort transaction");
            }
            Err(error)
        }
    }
}
