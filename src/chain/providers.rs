use ethers::prelude::*;
use std::str::FromStr;
use std::sync::Arc;

/// Provider wrapped with the configured wallet; used for every write.
pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

pub fn create_provider(rpc_url: &str) -> Result<Arc<Provider<Http>>, Box<dyn std::error::Error>> {
    let provider = Provider::<Http>::try_from(rpc_url)?;
    Ok(Arc::new(provider))
}

pub fn create_signer(
    provider: Arc<Provider<Http>>,
    private_key: &str,
    chain_id: u64,
) -> Result<Arc<SignerClient>, Box<dyn std::error::Error>> {
    let wallet = LocalWallet::from_str(private_key.trim_start_matches("0x"))?.with_chain_id(chain_id);
    log::info!("Signer configured for account {:?}", wallet.address());
    Ok(Arc::new(SignerMiddleware::new((*provider).clone(), wallet)))
}
