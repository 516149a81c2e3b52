//! Small helpers for list futures and fallible streams.

use futures::future::join_all;
use futures::{Future, Stream, StreamExt};

/// Appends the results of `rest`, awaited concurrently, to `first`. Order is kept.
pub async fn append<T, F>(first: Option<Vec<T>>, rest: impl IntoIterator<Item = F>) -> Vec<T>
where
    F: Future<Output = Vec<T>>,
{
    let mut out = first.unwrap_or_default();
    for batch in join_all(rest).await {
        out.extend(batch);
    }
    out
}

/// Maps a possibly absent list.
pub fn map_list<T, U>(source: Option<Vec<T>>, f: impl FnMut(T) -> U) -> Option<Vec<U>> {
    source.map(|items| items.into_iter().map(f).collect())
}

/// Collects a fallible stream up to its first error.
///
/// Returns the items read so far together with the error that stopped the stream, if any.
pub async fn read_to_list<T, E, S>(stream: S) -> (Vec<T>, Option<E>)
where
    S: Stream<Item = Result<T, E>>,
{
    futures::pin_mut!(stream);
    let mut items = Vec::new();
    while let Some(next) = stream.next().await {
        match next {
            Ok(item) => items.push(item),
            Err(err) => return (items, Some(err)),
        }
    }
    (items, None)
}

/// Concatenates a fallible stream of byte chunks.
pub async fn read_to_buffer<B, E, S>(stream: S) -> Result<Vec<u8>, E>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    futures::pin_mut!(stream);
    let mut buffer = Vec::new();
    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(chunk?.as_ref());
    }
    Ok(buffer)
}
