use alloy::sol;

sol! {
    event NewMetadata(address indexed account, bytes metadata);
}
