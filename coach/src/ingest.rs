//! Document ingestion: chunk a text and embed every chunk.

use serde::{Deserialize, Serialize};

use crate::llm::{Chunk, GatewayError, ModelGateway};

/// A chunk and its serialized embedding, ready for the vector store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub embedding: String,
}

/// Splits `text` with the gateway's splitter and embeds each chunk in order.
///
/// Chunks are embedded one at a time; the first gateway error aborts the document.
pub async fn embed_document(
    gateway: &dyn ModelGateway,
    text: &str,
) -> Result<Vec<EmbeddedChunk>, GatewayError> {
    let chunks = gateway.chunk(text);
    tracing::debug!(chunks = chunks.len(), chars = text.chars().count(), "embedding document");

    let mut out = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let embedding = gateway.embed(&chunk.content).await?;
        out.push(EmbeddedChunk { chunk, embedding });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockGateway, TextSplitter};

    #[tokio::test]
    async fn embeds_every_chunk_in_order() {
        let gw = MockGateway::with_texts(["unused"])
            .with_splitter(TextSplitter::new(10, 2).unwrap())
            .with_dimension(3);
        let text = "alpha beta gamma delta epsilon zeta";
        let out = embed_document(&gw, text).await.unwrap();

        assert!(out.len() > 1);
        let chunks = gw.chunk(text);
        assert_eq!(out.len(), chunks.len());
        for (embedded, chunk) in out.iter().zip(chunks) {
            assert_eq!(embedded.chunk, chunk);
            assert_eq!(embedded.embedding, gw.embed(&chunk.content).await.unwrap());
        }
    }

    #[tokio::test]
    async fn blank_document_has_no_chunks() {
        let gw = MockGateway::with_texts(["unused"]);
        assert!(embed_document(&gw, "   \n ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn serializes_flat_with_offsets() {
        let gw = MockGateway::with_texts(["unused"]).with_dimension(2);
        let out = embed_document(&gw, "short text").await.unwrap();
        let json = serde_json::to_value(&out[0]).unwrap();
        assert_eq!(json["content"], "short text");
        assert_eq!(json["startOffset"], 0);
        assert_eq!(json["endOffset"], 10);
        assert!(json["embedding"].as_str().unwrap().starts_with('['));
    }
}
