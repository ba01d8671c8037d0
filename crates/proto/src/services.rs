//! gRPC method paths served by consensus and mirror nodes.

/// Submit a crypto transfer.
pub const CRYPTO_TRANSFER: &str = "/proto.CryptoService/cryptoTransfer";

/// Fetch a transaction receipt.
pub const GET_TRANSACTION_RECEIPTS: &str = "/proto.CryptoService/getTransactionReceipts";

/// Fetch a transaction record.
pub const GET_TX_RECORD_BY_TX_ID: &str = "/proto.CryptoService/getTxRecordByTxID";

/// Submit a message to a consensus topic.
pub const SUBMIT_MESSAGE: &str = "/proto.ConsensusService/submitMessage";

/// Append contents to a file.
pub const APPEND_CONTENT: &str = "/proto.FileService/appendContent";

/// Mirror node topic subscription (server streaming).
pub const SUBSCRIBE_TOPIC: &str =
    "/com.hedera.mirror.api.proto.ConsensusService/subscribeTopic";
