//! Construction of the authenticated `azure_devops_rust_api` clients.

use anyhow::{Context as _, Result};
use azure_core::Bytes;
use azure_core::http::{ClientOptions, Context, Method, Pipeline, Request, Url, headers};
use azure_devops_rust_api::{core, git, graph, ims};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::credential::PatCredential;

const REST_ENDPOINT: &str = "https://dev.azure.com";
const REST_API_VERSION: &str = "7.1-preview";

/// Bundle of the Azure DevOps service clients the adapter talks to.
///
/// One client per REST area: projects (`core`), repositories and pull requests (`git`),
/// subject queries (`graph`) and legacy identities (`ims`). Connection data and pull request
/// updates are plain JSON requests on an `azure_core` pipeline. All of them share one
/// credential and one organization.
///
/// # Example
///
/// ```rust
/// use ado_gitter::api::{AzureDevOpsClient, PatCredential};
///
/// let client = AzureDevOpsClient::new(
///     "my-org".to_string(),
///     &PatCredential::from_string("my-pat".to_string()),
/// );
/// assert_eq!(client.organization(), "my-org");
/// ```
#[derive(Clone)]
pub struct AzureDevOpsClient {
    pub(crate) organization: String,
    pub(crate) core_client: core::Client,
    pub(crate) git_client: git::Client,
    pub(crate) graph_client: graph::Client,
    pub(crate) ims_client: ims::Client,
    pub(crate) rest_client: RestClient,
}

impl AzureDevOpsClient {
    /// Builds every client for `organization`, authenticating with `credential`.
    pub fn new(organization: String, credential: &PatCredential) -> Self {
        let ado_credential = credential.to_client_credential();

        Self {
            organization,
            core_client: core::ClientBuilder::new(ado_credential.clone()).build(),
            git_client: git::ClientBuilder::new(ado_credential.clone()).build(),
            graph_client: graph::ClientBuilder::new(ado_credential.clone()).build(),
            ims_client: ims::ClientBuilder::new(ado_credential).build(),
            rest_client: RestClient::new(credential),
        }
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }
}

impl std::fmt::Debug for AzureDevOpsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureDevOpsClient")
            .field("organization", &self.organization)
            .finish_non_exhaustive()
    }
}

/// Plain JSON requests on the `azure_core` pipeline.
///
/// Used where the generated request models cannot carry a field the REST API accepts, such as
/// `targetRefName` on a pull request update, or where the generated crate has no client.
#[derive(Clone)]
pub(crate) struct RestClient {
    authorization: SecretString,
    pipeline: Pipeline,
}

impl RestClient {
    fn new(credential: &PatCredential) -> Self {
        let pipeline = Pipeline::new(
            option_env!("CARGO_PKG_NAME"),
            option_env!("CARGO_PKG_VERSION"),
            ClientOptions::default(),
            Vec::new(),
            Vec::new(),
            None,
        );
        Self {
            authorization: credential.basic_authorization(),
            pipeline,
        }
    }

    /// URL of `path` (starting with the organization), with the API version appended.
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{REST_ENDPOINT}/{path}"))
            .with_context(|| format!("Invalid Azure DevOps path '{path}'"))?;
        url.query_pairs_mut()
            .append_pair("api-version", REST_API_VERSION);
        Ok(url)
    }

    pub(crate) fn request<B>(&self, method: Method, url: Url, body: Option<&B>) -> Result<Request>
    where
        B: Serialize + ?Sized,
    {
        let mut request = Request::new(url, method);
        request.insert_header(
            headers::AUTHORIZATION,
            self.authorization.expose_secret().to_string(),
        );
        if let Some(body) = body {
            let json = serde_json::to_vec(body).context("Failed to serialize request body")?;
            request.insert_header(headers::CONTENT_TYPE, "application/json");
            request.set_body(Bytes::from(json));
        }
        Ok(request)
    }

    /// Sends `request` and parses the JSON response. Non-success statuses are errors.
    pub(crate) async fn send<T: DeserializeOwned>(&self, mut request: Request) -> Result<T> {
        let response = self
            .pipeline
            .send(&Context::new(), &mut request, None)
            .await?;
        let body = response.into_body().into_string()?;
        serde_json::from_str(&body).context("Azure DevOps response did not have the expected shape")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// # Client Creation and Accessors
    ///
    /// Tests that the client bundle can be built without network access.
    ///
    /// ## Test Scenario
    /// - Builds the bundle with a test organization and token
    ///
    /// ## Expected Outcome
    /// - The organization accessor returns the constructor value
    /// - Debug output does not leak the token
    #[test]
    fn test_client_creation_and_accessors() {
        let credential = PatCredential::from_string("test-pat".to_string());
        let client = AzureDevOpsClient::new("test-org".to_string(), &credential);

        assert_eq!(client.organization(), "test-org");
        let rendered = format!("{:?}", client);
        assert!(rendered.contains("test-org"));
        assert!(!rendered.contains("test-pat"));
    }

    /// # REST Request Building
    ///
    /// Tests the requests sent outside the generated clients.
    ///
    /// ## Test Scenario
    /// - Builds a body-less GET and a JSON PATCH for a project with a space in its name
    ///
    /// ## Expected Outcome
    /// - The URL is under the organization with the API version appended
    /// - The token is sent with Basic authentication
    /// - Only the PATCH carries a JSON body and content type
    #[test]
    fn test_rest_request_building() {
        let rest = RestClient::new(&PatCredential::from_string("test-pat".to_string()));

        let url = rest.url("contoso/_apis/connectionData").unwrap();
        assert_eq!(
            url.as_str(),
            "https://dev.azure.com/contoso/_apis/connectionData?api-version=7.1-preview"
        );
        let get = rest.request::<()>(Method::Get, url, None).unwrap();
        assert_eq!(
            get.headers().get_optional_str(&headers::AUTHORIZATION),
            Some("Basic OnRlc3QtcGF0")
        );
        assert!(get.headers().get_optional_str(&headers::CONTENT_TYPE).is_none());
        assert!(get.body().is_empty());

        let url = rest
            .url("contoso/Mobile Apps/_apis/git/repositories/r-1/pullrequests/7")
            .unwrap();
        assert!(url.as_str().contains("/Mobile%20Apps/"));
        let body = json!({ "targetRefName": "refs/heads/release" });
        let patch = rest.request(Method::Patch, url, Some(&body)).unwrap();
        assert_eq!(
            patch.headers().get_optional_str(&headers::CONTENT_TYPE),
            Some("application/json")
        );
        let sent: serde_json::Value = serde_json::from_slice(&Bytes::from(patch.body())).unwrap();
        assert_eq!(sent, body);
    }
}
