//! REST repository
//!
//! Talks to a json-server style collaborator exposing `/usuarios`, `/cuentas`,
//! `/transferencias` and `/login`. Records travel with their Spanish field
//! names, see the serde attributes on the domain types.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Method;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::result::{Error, Result};
use crate::domain::{
    Account, AccountDraft, AccountPatch, BalanceUpdate, Session, Transfer, TransferStatus, User,
    UserDraft, UserPatch,
};
use crate::ports::Repository;

/// Request timeout in seconds
const TIMEOUT_SECS: u64 = 30;

#[derive(Serialize)]
struct BalancePatch {
    #[serde(rename = "saldo", with = "rust_decimal::serde::float")]
    balance: Decimal,
}

#[derive(Serialize)]
struct StatusPatch {
    #[serde(rename = "estado")]
    status: TransferStatus,
}

#[derive(Serialize)]
struct ConceptPatch<'a> {
    #[serde(rename = "concepto")]
    concept: &'a str,
}

#[derive(Serialize)]
struct PasswordPatch<'a> {
    password: &'a str,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    usuario: User,
    token: String,
}

/// Check that a base URL is usable: absolute, http or https
pub fn validate_base_url(base_url: &str) -> Result<Url> {
    let url = Url::parse(base_url)
        .map_err(|e| Error::Config(format!("Invalid API URL '{}': {}", base_url, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::Config(format!(
            "Unsupported API URL scheme '{}' (expected http or https)",
            other
        ))),
    }
}

/// Repository backed by the REST collaborator
#[derive(Debug)]
pub struct RestRepository {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl RestRepository {
    /// Create a client for `base_url`, sending `token` as a bearer token when set
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        validate_base_url(base_url)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().map_err(|e| self.map_request_error(e))?;
        check_response_status(response)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(self.request(Method::GET, path))?;
        parse_json(response)
    }

    /// GET that maps 404 to `None`
    fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        match self.get(path) {
            Ok(value) => Ok(Some(value)),
            Err(Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.send(self.request(method, path).json(body))?;
        parse_json(response)
    }

    /// DELETE that maps 404 to `false`
    fn delete(&self, path: &str) -> Result<bool> {
        match self.send(self.request(Method::DELETE, path)) {
            Ok(_) => Ok(true),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Read every affected balance, check the debits, then PATCH the new
    /// values. Not atomic: another client can still write in between.
    fn write_balances(&self, balances: &[BalanceUpdate]) -> Result<()> {
        let mut patches = Vec::with_capacity(balances.len());
        for update in balances {
            let account: Account = self
                .get_optional(&format!("/cuentas/{}", update.account_id))?
                .ok_or_else(|| Error::not_found(format!("account {}", update.account_id)))?;
            let balance = account.balance + update.delta;
            if update.is_debit() && balance < Decimal::ZERO {
                return Err(Error::validation("monto", "El monto excede el saldo disponible"));
            }
            patches.push((update.account_id, balance));
        }

        for (account_id, balance) in patches {
            let _: Account = self.send_json(
                Method::PATCH,
                &format!("/cuentas/{}", account_id),
                &BalancePatch { balance },
            )?;
        }
        Ok(())
    }

    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Http(format!("Connection timed out after {} seconds", TIMEOUT_SECS))
        } else if error.is_connect() {
            Error::Http(format!("Unable to connect to {}", self.base_url))
        } else {
            Error::Http(format!("Request failed: {}", error))
        }
    }
}

fn check_response_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let path = response.url().path().to_string();
    match status.as_u16() {
        404 => Err(Error::not_found(path)),
        401 | 403 => Err(Error::Auth(format!("Access denied (HTTP {})", status.as_u16()))),
        code => Err(Error::Http(format!("HTTP {}", code))),
    }
}

fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json()
        .map_err(|e| Error::Http(format!("Invalid response body: {}", e)))
}

impl Repository for RestRepository {
    fn backend_name(&self) -> &'static str {
        "rest"
    }

    // === Users ===

    fn list_users(&self) -> Result<Vec<User>> {
        self.get("/usuarios")
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.get_optional(&format!("/usuarios/{}", id))
    }

    fn create_user(&self, draft: &UserDraft) -> Result<User> {
        let mut user = draft.clone().into_user(0, chrono::Utc::now());
        user.id = None;
        self.send_json(Method::POST, "/usuarios", &user)
    }

    fn update_user(&self, id: i64, patch: &UserPatch) -> Result<User> {
        self.send_json(Method::PATCH, &format!("/usuarios/{}", id), patch)
    }

    fn delete_user(&self, id: i64) -> Result<bool> {
        self.delete(&format!("/usuarios/{}", id))
    }

    // === Accounts ===

    fn list_accounts(&self) -> Result<Vec<Account>> {
        self.get("/cuentas")
    }

    fn get_account(&self, id: i64) -> Result<Option<Account>> {
        self.get_optional(&format!("/cuentas/{}", id))
    }

    fn list_accounts_by_owner(&self, owner_id: i64) -> Result<Vec<Account>> {
        self.get(&format!("/cuentas?usuarioId={}", owner_id))
    }

    fn create_account(&self, draft: &AccountDraft) -> Result<Account> {
        let mut account = draft.clone().into_account(0, chrono::Utc::now());
        account.id = None;
        self.send_json(Method::POST, "/cuentas", &account)
    }

    fn update_account(&self, id: i64, patch: &AccountPatch) -> Result<Account> {
        self.send_json(Method::PATCH, &format!("/cuentas/{}", id), patch)
    }

    fn delete_account(&self, id: i64) -> Result<bool> {
        self.delete(&format!("/cuentas/{}", id))
    }

    // === Transfers ===

    fn list_transfers(&self) -> Result<Vec<Transfer>> {
        self.get("/transferencias")
    }

    fn get_transfer(&self, id: i64) -> Result<Option<Transfer>> {
        self.get_optional(&format!("/transferencias/{}", id))
    }

    fn update_transfer_concept(&self, id: i64, concept: &str) -> Result<Transfer> {
        self.send_json(
            Method::PATCH,
            &format!("/transferencias/{}", id),
            &ConceptPatch { concept },
        )
    }

    /// Balances first, then the transfer record.
    ///
    /// The collaborator has no transactions: a failure part-way leaves the
    /// earlier writes in place. `ld doctor` on the local store and the
    /// transfer list are the way to spot it.
    fn record_transfer(&self, transfer: &Transfer, balances: &[BalanceUpdate]) -> Result<Transfer> {
        self.write_balances(balances)?;
        let mut body = transfer.clone();
        body.id = None;
        self.send_json(Method::POST, "/transferencias", &body)
    }

    fn settle_transfer(
        &self,
        id: i64,
        status: TransferStatus,
        balances: &[BalanceUpdate],
    ) -> Result<Transfer> {
        let current = self
            .get_transfer(id)?
            .ok_or_else(|| Error::not_found(format!("transfer {}", id)))?;
        if !current.status.can_transition_to(status) {
            return Err(Error::InvalidTransition(format!(
                "transfer {} is {}, cannot become {}",
                id, current.status, status
            )));
        }
        self.write_balances(balances)?;
        self.send_json(
            Method::PATCH,
            &format!("/transferencias/{}", id),
            &StatusPatch { status },
        )
    }

    // === Auth ===

    fn authenticate(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .send(
                self.request(Method::POST, "/login")
                    .json(&LoginRequest { email, password }),
            )
            .map_err(|e| match e {
                Error::Auth(_) | Error::NotFound(_) => {
                    Error::Auth("Credenciales inválidas".to_string())
                }
                other => other,
            })?;
        let login: LoginResponse = parse_json(response)?;
        Ok(Session {
            user: login.usuario,
            token: login.token,
        })
    }

    /// Tokens are stateless on the collaborator side
    fn end_session(&self, _token: &str) -> Result<()> {
        Ok(())
    }

    fn set_password(&self, user_id: i64, password: &str) -> Result<()> {
        let _: User = self.send_json(
            Method::PATCH,
            &format!("/usuarios/{}", user_id),
            &PasswordPatch { password },
        )?;
        Ok(())
    }
}
