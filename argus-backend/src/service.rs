//! WalletService - the operations callers actually use.
//!
//! Wires the provisioners, the record store and the dispatcher together.
//! Provisioning is serialized per user; everything else is independent.

use dashmap::DashMap;
use ethers::types::{Address, U256};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::chain::ChainClient;
use crate::config::Config;
use crate::db::Database;
use crate::error::{ProvisioningProgress, ProvisioningStage, WalletError};
use crate::keys::KeyDerivationService;
use crate::models::{WalletInfo, WalletRecord};
use crate::protocols::registry::ActionDescription;
use crate::protocols::silo::{SiloApr, SiloCallBuilder};
use crate::protocols::token::TokenCallBuilder;
use crate::protocols::{ActionDispatcher, ActionParams, WalletContext};
use crate::provisioning::authorizers::role_bytes;
use crate::provisioning::{
    AuthorizerKind, AuthorizerProvisioner, DelegateModuleProvisioner, SeedingStep, WalletProvisioner,
};
use crate::tx::{TransactionResult, TransactionSigner};

/// Authorizers every new wallet gets, in creation order
pub const DEFAULT_AUTHORIZERS: &[AuthorizerKind] =
    &[AuthorizerKind::ApproveAuthorizerV2, AuthorizerKind::SiloAuthorizer];

/// Result of a completed `create_wallet`
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedWallet {
    pub user_address: Address,
    pub wallet_address: Address,
    pub delegate_module_address: Address,
    pub agent_address: Address,
    /// Authorizer kind -> deployed authorizer
    pub authorizers: BTreeMap<String, Address>,
    pub ownership_transferred: bool,
}

pub struct WalletService {
    config: Arc<Config>,
    db: Arc<Database>,
    keys: KeyDerivationService,
    signer: Arc<TransactionSigner>,
    wallets: WalletProvisioner,
    argus: DelegateModuleProvisioner,
    authorizers: AuthorizerProvisioner,
    dispatcher: ActionDispatcher,
    user_locks: DashMap<Address, Arc<Mutex<()>>>,
}

fn incomplete(stage: ProvisioningStage, progress: &ProvisioningProgress, source: WalletError) -> WalletError {
    log::warn!(
        "[WalletService] Provisioning stopped at {} ({}): {}",
        stage,
        progress,
        source
    );
    WalletError::ProvisioningIncomplete {
        stage,
        progress: Box::new(progress.clone()),
        source: Box::new(source),
    }
}

impl WalletService {
    pub fn new(config: Arc<Config>, db: Arc<Database>, chain: Arc<dyn ChainClient>) -> Self {
        let signer = Arc::new(TransactionSigner::new(chain, &config));

        Self {
            keys: KeyDerivationService::new(config.agent_mnemonic.clone()),
            wallets: WalletProvisioner::new(signer.clone(), config.contracts.clone()),
            argus: DelegateModuleProvisioner::new(signer.clone(), config.contracts.clone()),
            authorizers: AuthorizerProvisioner::new(
                signer.clone(),
                config.contracts.clone(),
                config.seeds.clone(),
            ),
            dispatcher: ActionDispatcher::new(
                signer.clone(),
                config.protocols.clone(),
                config.seeds.silos.clone(),
                config.chain_id,
            ),
            signer,
            db,
            config,
            user_locks: DashMap::new(),
        }
    }

    fn lock_for(&self, user: Address) -> Arc<Mutex<()>> {
        self.user_locks
            .entry(user)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// What the store says is already on-chain for `record`
    fn stored_progress(&self, record: &WalletRecord) -> Result<ProvisioningProgress, WalletError> {
        Ok(ProvisioningProgress {
            wallet_address: Some(record.wallet_address),
            delegate_module_address: record.delegate_module_address,
            authorizers: self.db.get_authorizers(record.user_address)?,
            ownership_transferred: record.ownership_transferred,
        })
    }

    fn is_fully_provisioned(&self, progress: &ProvisioningProgress) -> bool {
        progress.delegate_module_address.is_some()
            && DEFAULT_AUTHORIZERS
                .iter()
                .all(|kind| progress.authorizers.contains_key(&kind.to_string()))
            && (progress.ownership_transferred || !self.config.transfer_ownership_to_user)
    }

    /// Provision a Safe, its Argus module and the default authorizers for
    /// `user`, then hand Safe ownership to the user when configured.
    ///
    /// Steps are independent transactions. A failure after the Safe exists
    /// comes back as `ProvisioningIncomplete` with everything created so far.
    /// Calling again for the same user picks up from the stored record and
    /// only runs the steps that never completed; a fully provisioned user
    /// gets `DuplicateWallet`.
    pub async fn create_wallet(&self, user: Address) -> Result<ProvisionedWallet, WalletError> {
        let lock = self.lock_for(user);
        let _guard = lock.lock().await;

        let existing = match self.db.get_wallet(user) {
            Ok(record) => Some(record),
            Err(WalletError::WalletNotFound(_)) => None,
            Err(e) => return Err(e),
        };

        let (record, mut progress) = match existing {
            Some(record) => {
                let progress = self.stored_progress(&record)?;
                if self.is_fully_provisioned(&progress) {
                    return Err(WalletError::DuplicateWallet(user));
                }
                log::info!("[WalletService] Resuming provisioning for {:?} ({})", user, progress);
                (record, progress)
            }
            None => {
                // Fail before anything is deployed
                if !self.keys.is_configured() {
                    return Err(WalletError::SeedNotConfigured);
                }

                log::info!("[WalletService] Creating wallet for {:?}", user);
                let mut progress = ProvisioningProgress::default();

                let wallet = self
                    .wallets
                    .create_from_controller()
                    .await
                    .map_err(|e| incomplete(ProvisioningStage::DeployWallet, &progress, e))?;
                progress.wallet_address = Some(wallet);

                let record = self
                    .db
                    .create_wallet_record(&self.keys, user, wallet)
                    .map_err(|e| incomplete(ProvisioningStage::RecordWallet, &progress, e))?;
                (record, progress)
            }
        };
        let wallet = record.wallet_address;

        let module = match record.delegate_module_address {
            Some(module) => module,
            None => {
                let module = self
                    .argus
                    .attach_to_wallet(wallet, user)
                    .await
                    .map_err(|e| incomplete(ProvisioningStage::AttachDelegateModule, &progress, e))?;
                progress.delegate_module_address = Some(module);

                self.db
                    .set_delegate_module(user, module)
                    .map_err(|e| incomplete(ProvisioningStage::RecordDelegateModule, &progress, e))?;
                module
            }
        };

        for kind in DEFAULT_AUTHORIZERS {
            if progress.authorizers.contains_key(&kind.to_string()) {
                continue;
            }
            let stage = ProvisioningStage::CreateAuthorizer(kind.to_string());

            let created = self
                .authorizers
                .create_authorizer(wallet, module, user, record.agent_address, *kind, kind.default_role())
                .await;

            match created {
                Ok(authorizer) => {
                    progress.authorizers.insert(kind.to_string(), authorizer);
                    self.db
                        .record_authorizer(user, *kind, authorizer)
                        .map_err(|e| incomplete(stage, &progress, e))?;
                }
                Err(e) => {
                    // Deployed but not fully set up; still report where it lives
                    if let WalletError::RoleWiringFailed { authorizer, .. }
                    | WalletError::SeedingFailed { authorizer, .. } = &e
                    {
                        progress.authorizers.insert(kind.to_string(), *authorizer);
                    }
                    return Err(incomplete(stage, &progress, e));
                }
            }
        }

        if self.config.transfer_ownership_to_user && !progress.ownership_transferred {
            self.wallets
                .transfer_ownership(wallet, user)
                .await
                .map_err(|e| incomplete(ProvisioningStage::TransferOwnership, &progress, e))?;
            progress.ownership_transferred = true;

            self.db
                .mark_ownership_transferred(user)
                .map_err(|e| incomplete(ProvisioningStage::TransferOwnership, &progress, e))?;
        }

        log::info!(
            "[WalletService] Wallet {:?} ready for {:?} (module {:?}, {} authorizers)",
            wallet,
            user,
            module,
            progress.authorizers.len()
        );

        Ok(ProvisionedWallet {
            user_address: user,
            wallet_address: wallet,
            delegate_module_address: module,
            agent_address: record.agent_address,
            authorizers: progress.authorizers,
            ownership_transferred: progress.ownership_transferred,
        })
    }

    /// Run `action` for `user` through their delegate module. A reverted
    /// transaction is an error here.
    pub async fn execute_action(
        &self,
        user: Address,
        action: &str,
        params: &ActionParams,
    ) -> Result<TransactionResult, WalletError> {
        let record = self.db.get_wallet(user)?;
        let result = self.dispatcher.dispatch(&record, action, params).await?;

        if !result.is_success() {
            log::warn!("[WalletService] {} for {:?} reverted: {:?}", action, user, result.tx_hash);
        }
        result.require_success()
    }

    /// Action catalogue; needs no wallet, chain or database
    pub fn describe_actions() -> BTreeMap<&'static str, ActionDescription> {
        ActionDispatcher::describe_all()
    }

    pub fn get_wallet_info(&self, user: Address) -> Result<WalletInfo, WalletError> {
        Ok(self.db.get_wallet(user)?.info())
    }

    /// Re-run an authorizer's seeding sequence starting at `from`. Once it
    /// completes the authorizer is recorded, so a later `create_wallet` for
    /// the user skips it.
    pub async fn resume_seeding(
        &self,
        user: Address,
        kind: AuthorizerKind,
        authorizer: Address,
        from: SeedingStep,
    ) -> Result<(), WalletError> {
        let record = self.db.get_wallet(user)?;
        log::info!(
            "[WalletService] Resuming {} seeding of {:?} at {}",
            kind,
            authorizer,
            from
        );
        self.authorizers
            .seed(record.wallet_address, authorizer, user, kind, Some(from))
            .await?;
        self.db.record_authorizer(user, kind, authorizer)
    }

    /// Re-submit the role wiring batch for an authorizer whose wiring failed
    pub async fn rewire_role(
        &self,
        user: Address,
        kind: AuthorizerKind,
        authorizer: Address,
    ) -> Result<TransactionResult, WalletError> {
        let record = self.db.get_wallet(user)?;
        let module = record
            .delegate_module_address
            .ok_or(WalletError::DelegateModuleMissing(user))?;
        let role = role_bytes(kind.default_role())?;

        self.authorizers
            .wire_role(record.wallet_address, module, authorizer, role, record.agent_address)
            .await
    }

    fn context_for_user(&self, user: Address) -> Result<WalletContext, WalletError> {
        self.dispatcher.context_for(&self.db.get_wallet(user)?)
    }

    /// Native balance of the user's Safe
    pub async fn wallet_balance(&self, user: Address) -> Result<U256, WalletError> {
        TokenCallBuilder::new(self.context_for_user(user)?).native_balance().await
    }

    pub async fn token_balance(&self, user: Address, token: Address) -> Result<U256, WalletError> {
        TokenCallBuilder::new(self.context_for_user(user)?)
            .token_balance(token)
            .await
    }

    /// Allowance the user's Safe has granted `spender` on `token`
    pub async fn token_allowance(&self, user: Address, token: Address, spender: Address) -> Result<U256, WalletError> {
        TokenCallBuilder::new(self.context_for_user(user)?)
            .allowance(token, spender)
            .await
    }

    pub async fn silo_deposit_aprs(&self, user: Address) -> Result<Vec<SiloApr>, WalletError> {
        SiloCallBuilder::new(self.context_for_user(user)?).deposit_aprs().await
    }

    pub fn controller_address(&self) -> Address {
        self.signer.controller_address()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{self, authorizer, erc20};
    use crate::test_support::{test_config, test_service, MockChain};
    use crate::tx::types::TxStatus;
    use ethers::abi::Token;
    use serde_json::json;
    use tempfile::TempDir;

    struct Harness {
        service: WalletService,
        mock: Arc<MockChain>,
        _dir: TempDir,
    }

    fn harness_with(config: Config) -> Harness {
        let (service, mock, dir) = test_service(config);
        Harness {
            service,
            mock,
            _dir: dir,
        }
    }

    fn harness() -> Harness {
        harness_with(test_config())
    }

    fn user() -> Address {
        Address::repeat_byte(0xaa)
    }

    #[tokio::test]
    async fn test_create_wallet_provisions_everything() {
        let h = harness();
        let created = h.service.create_wallet(user()).await.unwrap();

        assert_eq!(created.wallet_address, MockChain::wallet_address(0));
        assert_eq!(created.delegate_module_address, MockChain::module_address(0));
        assert_eq!(
            created.authorizers.get("ApproveAuthorizerV2"),
            Some(&MockChain::authorizer_address(0))
        );
        assert_eq!(
            created.authorizers.get("SiloAuthorizer"),
            Some(&MockChain::authorizer_address(1))
        );
        assert!(created.ownership_transferred);

        // First agent key comes from index 0 of the test mnemonic
        assert_eq!(
            format!("{:?}", created.agent_address),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );

        let info = h.service.get_wallet_info(user()).unwrap();
        assert_eq!(info.wallet_address, created.wallet_address);
        assert_eq!(info.delegate_module_address, Some(created.delegate_module_address));
        assert_eq!(info.agent_address, created.agent_address);

        // deploy, init module, 2 + 4 approve, 2 + 3 silo, ownership
        assert_eq!(h.mock.sent().len(), 14);
    }

    #[tokio::test]
    async fn test_second_wallet_gets_fresh_agent_key() {
        let h = harness();
        let first = h.service.create_wallet(user()).await.unwrap();
        let second = h.service.create_wallet(Address::repeat_byte(0xbb)).await.unwrap();
        assert_ne!(first.agent_address, second.agent_address);
        assert_ne!(first.wallet_address, second.wallet_address);
    }

    #[tokio::test]
    async fn test_duplicate_wallet_sends_nothing() {
        let h = harness();
        h.service.create_wallet(user()).await.unwrap();
        let before = h.mock.sent().len();

        assert!(matches!(
            h.service.create_wallet(user()).await,
            Err(WalletError::DuplicateWallet(u)) if u == user()
        ));
        assert_eq!(h.mock.sent().len(), before);
    }

    #[tokio::test]
    async fn test_missing_mnemonic_fails_before_deploying() {
        let mut config = test_config();
        config.agent_mnemonic = None;
        let h = harness_with(config);

        assert!(matches!(
            h.service.create_wallet(user()).await,
            Err(WalletError::SeedNotConfigured)
        ));
        assert!(h.mock.sent().is_empty());
    }

    #[tokio::test]
    async fn test_approve_action_builds_exact_erc20_payload() {
        let h = harness();
        let created = h.service.create_wallet(user()).await.unwrap();

        let token = Address::repeat_byte(0x71);
        let spender = Address::repeat_byte(0x52);
        let params = ActionParams::from_json(json!({
            "token": format!("{:?}", token),
            "spender": format!("{:?}", spender),
            "amount": "1000",
        }))
        .unwrap();

        let result = h.service.execute_action(user(), "approve", &params).await.unwrap();
        assert_eq!(result.status, TxStatus::Success);

        let sent = h.mock.sent();
        let last = sent.last().unwrap();
        assert_eq!(last.from, created.agent_address);
        assert_eq!(last.to, created.delegate_module_address);
        assert_eq!(last.hash, result.tx_hash);

        let call = last.module_inner_call().unwrap();
        assert_eq!(call.to, token);
        assert_eq!(
            call.data,
            abi::encode_call(erc20::APPROVE, &[Token::Address(spender), Token::Uint(U256::from(1000u64))])
        );
    }

    #[tokio::test]
    async fn test_reverted_action_is_an_error() {
        let h = harness();
        h.service.create_wallet(user()).await.unwrap();
        h.mock.fail_selector(erc20::APPROVE);

        let params = ActionParams::from_json(json!({
            "token": "0x1111111111111111111111111111111111111111",
            "spender": "0x2222222222222222222222222222222222222222",
        }))
        .unwrap();
        assert!(matches!(
            h.service.execute_action(user(), "approve", &params).await,
            Err(WalletError::TransactionReverted(_))
        ));
    }

    #[tokio::test]
    async fn test_action_for_unknown_user() {
        let h = harness();
        let params = ActionParams::from_json(json!({ "amount": "1" })).unwrap();
        assert!(matches!(
            h.service.execute_action(user(), "crowdfunding_contribute", &params).await,
            Err(WalletError::WalletNotFound(_))
        ));
        assert!(matches!(h.service.get_wallet_info(user()), Err(WalletError::WalletNotFound(_))));
    }

    #[tokio::test]
    async fn test_unknown_action_for_existing_wallet() {
        let h = harness();
        h.service.create_wallet(user()).await.unwrap();
        assert!(matches!(
            h.service.execute_action(user(), "bridge", &ActionParams::default()).await,
            Err(WalletError::UnknownAction(_))
        ));
    }

    #[tokio::test]
    async fn test_partial_failure_reports_progress_and_resumes() {
        let h = harness();
        h.mock.fail_selector(authorizer::ADD_POOL_ADDRESSES);

        let err = h.service.create_wallet(user()).await.unwrap_err();
        let (stage, progress, source) = match err {
            WalletError::ProvisioningIncomplete { stage, progress, source } => (stage, progress, source),
            other => panic!("unexpected: {:?}", other),
        };
        assert_eq!(stage, ProvisioningStage::CreateAuthorizer("SiloAuthorizer".to_string()));
        assert_eq!(progress.wallet_address, Some(MockChain::wallet_address(0)));
        assert_eq!(progress.delegate_module_address, Some(MockChain::module_address(0)));
        assert_eq!(progress.authorizers.len(), 2);
        assert!(!progress.ownership_transferred);
        assert!(matches!(
            *source,
            WalletError::SeedingFailed { step: SeedingStep::AddMarkets, .. }
        ));

        // The record survives with the module attached
        let info = h.service.get_wallet_info(user()).unwrap();
        assert_eq!(info.delegate_module_address, Some(MockChain::module_address(0)));

        h.mock.clear_failures();
        let silo = progress.authorizers["SiloAuthorizer"];
        h.service
            .resume_seeding(user(), AuthorizerKind::SiloAuthorizer, silo, SeedingStep::AddMarkets)
            .await
            .unwrap();

        // Only the ownership transfer is left
        let before = h.mock.sent().len();
        let created = h.service.create_wallet(user()).await.unwrap();
        assert_eq!(h.mock.sent().len(), before + 1);
        assert_eq!(created.authorizers["SiloAuthorizer"], silo);
        assert_eq!(
            created.authorizers["ApproveAuthorizerV2"],
            progress.authorizers["ApproveAuthorizerV2"]
        );
        assert!(created.ownership_transferred);
    }

    #[tokio::test]
    async fn test_failed_module_attachment_resumes_on_retry() {
        let h = harness();
        h.mock.fail_selector(abi::argus_helper::INIT_ARGUS);

        let err = h.service.create_wallet(user()).await.unwrap_err();
        match err {
            WalletError::ProvisioningIncomplete { stage, progress, .. } => {
                assert_eq!(stage, ProvisioningStage::AttachDelegateModule);
                assert_eq!(progress.wallet_address, Some(MockChain::wallet_address(0)));
                assert!(progress.delegate_module_address.is_none());
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(h.mock.sent().len(), 2);

        h.mock.clear_failures();
        let created = h.service.create_wallet(user()).await.unwrap();

        // Same Safe, nothing redeployed
        assert_eq!(created.wallet_address, MockChain::wallet_address(0));
        assert_eq!(created.delegate_module_address, MockChain::module_address(0));
        assert_eq!(created.authorizers.len(), 2);
        assert!(created.ownership_transferred);
        let deploys = h
            .mock
            .sent()
            .iter()
            .filter(|tx| abi::split_selector(&tx.data).map(|(s, _)| s)
                == Some(abi::selector(abi::safe_factory::CREATE_PROXY_WITH_NONCE)))
            .count();
        assert_eq!(deploys, 1);
        assert_eq!(h.mock.sent().len(), 2 + 13);

        let info = h.service.get_wallet_info(user()).unwrap();
        assert_eq!(info.delegate_module_address, Some(MockChain::module_address(0)));
        assert!(info.ownership_transferred);

        assert!(matches!(
            h.service.create_wallet(user()).await,
            Err(WalletError::DuplicateWallet(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_ownership_transfer_resumes_on_retry() {
        let h = harness();
        h.mock.fail_selector(abi::safe::SWAP_OWNER);

        let err = h.service.create_wallet(user()).await.unwrap_err();
        assert!(matches!(
            err,
            WalletError::ProvisioningIncomplete { stage: ProvisioningStage::TransferOwnership, .. }
        ));
        assert!(!h.service.get_wallet_info(user()).unwrap().ownership_transferred);

        h.mock.clear_failures();
        let before = h.mock.sent().len();
        let created = h.service.create_wallet(user()).await.unwrap();
        assert_eq!(h.mock.sent().len(), before + 1);
        assert!(created.ownership_transferred);
        assert_eq!(created.authorizers.get("SiloAuthorizer"), Some(&MockChain::authorizer_address(1)));
    }

    #[tokio::test]
    async fn test_retry_without_transfer_configured_is_duplicate() {
        let mut config = test_config();
        config.transfer_ownership_to_user = false;
        let h = harness_with(config);

        let created = h.service.create_wallet(user()).await.unwrap();
        assert!(!created.ownership_transferred);
        assert_eq!(h.mock.sent().len(), 13);
        assert!(matches!(
            h.service.create_wallet(user()).await,
            Err(WalletError::DuplicateWallet(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_create_for_one_user_provisions_once() {
        let h = harness();

        let (first, second) = tokio::join!(h.service.create_wallet(user()), h.service.create_wallet(user()));

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(WalletError::DuplicateWallet(u)) if *u == user())));
        assert_eq!(h.mock.sent().len(), 14);
    }

    #[tokio::test]
    async fn test_role_wiring_failure_can_be_rewired() {
        let h = harness();
        h.mock.fail_selector(crate::abi::multisend::MULTI_SEND);

        let err = h.service.create_wallet(user()).await.unwrap_err();
        let progress = match err {
            WalletError::ProvisioningIncomplete { progress, source, .. } => {
                assert_eq!(source.kind(), "role_wiring_failed");
                progress
            }
            other => panic!("unexpected: {:?}", other),
        };
        let approve = progress.authorizers["ApproveAuthorizerV2"];

        h.mock.clear_failures();
        let result = h
            .service
            .rewire_role(user(), AuthorizerKind::ApproveAuthorizerV2, approve)
            .await
            .unwrap();
        assert!(result.is_success());

        // Seeding never ran; once it has, a retry finishes the rest
        h.service
            .resume_seeding(
                user(),
                AuthorizerKind::ApproveAuthorizerV2,
                approve,
                SeedingStep::SetManagerToController,
            )
            .await
            .unwrap();
        let created = h.service.create_wallet(user()).await.unwrap();
        assert_eq!(created.authorizers["ApproveAuthorizerV2"], approve);
        assert_eq!(created.authorizers["SiloAuthorizer"], MockChain::authorizer_address(1));
        assert!(created.ownership_transferred);
    }

    #[tokio::test]
    async fn test_balances_read_the_safe() {
        let h = harness();
        let created = h.service.create_wallet(user()).await.unwrap();
        let token = Address::repeat_byte(0x71);
        h.mock.set_native_balance(created.wallet_address, U256::from(9u64));
        h.mock.set_token_balance(token, created.wallet_address, U256::from(123u64));

        assert_eq!(h.service.wallet_balance(user()).await.unwrap(), U256::from(9u64));
        assert_eq!(h.service.token_balance(user(), token).await.unwrap(), U256::from(123u64));

        let spender = Address::repeat_byte(0x52);
        h.mock.set_allowance(token, created.wallet_address, spender, U256::from(77u64));
        assert_eq!(
            h.service.token_allowance(user(), token, spender).await.unwrap(),
            U256::from(77u64)
        );
        assert_eq!(
            h.service.token_allowance(user(), token, Address::repeat_byte(0x53)).await.unwrap(),
            U256::zero()
        );
    }

    #[test]
    fn test_describe_actions_lists_every_action() {
        let described = WalletService::describe_actions();
        for name in ["approve", "silo_deposit", "silo_withdraw", "silo_deposit_native", "crowdfunding_contribute"] {
            assert!(described.contains_key(name), "missing {}", name);
        }
    }
}
