//! MCP server implementation using the official rmcp SDK.
//!
//! Exposes the NTDoc backend's team, document, log, and auth operations as
//! MCP tools. Every tool reads the caller's `authorization` header from the
//! request context, describes exactly one backend call as a
//! [`BackendRequest`], and relays the backend's response unchanged.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rmcp::handler::server::tool::{ToolCallContext, ToolRouter};
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{tool, tool_router, ErrorData as McpError, ServerHandler};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use crate::backend::{BackendClient, BackendError, BackendRequest};

// ============================================================================
// Tool Parameter Types
// ============================================================================

/// Parameters for fetching a single team
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetTeamByIdParams {
    /// ID of the team to fetch
    pub team_id: i64,
}

impl GetTeamByIdParams {
    fn to_request(&self) -> BackendRequest {
        BackendRequest::get(format!("/api/v1/teams/{}", self.team_id))
    }
}

/// Parameters for updating a team
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateTeamByIdParams {
    /// ID of the team to update
    pub team_id: i64,
    /// New team name
    pub name: String,
    /// New team description
    pub description: String,
}

impl UpdateTeamByIdParams {
    fn to_request(&self) -> BackendRequest {
        BackendRequest::put(format!("/api/v1/teams/{}", self.team_id)).json(json!({
            "name": self.name,
            "description": self.description,
        }))
    }
}

/// Parameters for deleting a team
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DeleteTeamByIdParams {
    /// ID of the team to delete
    pub team_id: i64,
}

impl DeleteTeamByIdParams {
    fn to_request(&self) -> BackendRequest {
        BackendRequest::delete(format!("/api/v1/teams/{}", self.team_id))
    }
}

/// Parameters for listing teams
#[derive(Debug, Clone, Deserialize, JsonSchema, Default)]
pub struct GetTeamsParams {
    /// Only include active teams
    #[serde(default)]
    pub active_only: Option<bool>,
}

impl GetTeamsParams {
    fn to_request(&self) -> BackendRequest {
        BackendRequest::get("/api/v1/teams").query_opt("activeOnly", self.active_only)
    }
}

/// Parameters for creating a team
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateTeamParams {
    /// Team name
    pub name: String,
    /// Team description
    pub description: String,
}

impl CreateTeamParams {
    fn to_request(&self) -> BackendRequest {
        BackendRequest::post("/api/v1/teams").json(json!({
            "name": self.name,
            "description": self.description,
        }))
    }
}

/// Parameters for changing a team member's role
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateTeamMemberRoleParams {
    /// ID of the team
    pub team_id: i64,
    /// ID of the member within the team
    pub member_id: i64,
    /// New role for the member
    pub role: String,
}

impl UpdateTeamMemberRoleParams {
    fn to_request(&self) -> BackendRequest {
        BackendRequest::put(format!(
            "/api/v1/teams/{}/members/{}",
            self.team_id, self.member_id
        ))
        .json(json!({ "role": self.role }))
    }
}

/// Parameters for removing a team member
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RemoveTeamMemberParams {
    /// ID of the team
    pub team_id: i64,
    /// ID of the member to remove
    pub member_id: i64,
}

impl RemoveTeamMemberParams {
    fn to_request(&self) -> BackendRequest {
        BackendRequest::delete(format!(
            "/api/v1/teams/{}/members/{}",
            self.team_id, self.member_id
        ))
    }
}

/// Parameters for listing team members
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetTeamMembersParams {
    /// ID of the team
    pub team_id: i64,
    /// Only include active members
    #[serde(default)]
    pub active_only: Option<bool>,
}

impl GetTeamMembersParams {
    fn to_request(&self) -> BackendRequest {
        BackendRequest::get(format!("/api/v1/teams/{}/members", self.team_id))
            .query_opt("activeOnly", self.active_only)
    }
}

/// Parameters for adding a team member
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AddTeamMemberParams {
    /// ID of the team
    pub team_id: i64,
    /// Keycloak user ID of the member to add
    pub user_kc_id: i64,
    /// Role to grant the new member
    pub role: String,
}

impl AddTeamMemberParams {
    fn to_request(&self) -> BackendRequest {
        BackendRequest::post(format!("/api/v1/teams/{}/members", self.team_id)).json(json!({
            "userKcId": self.user_kc_id,
            "role": self.role,
        }))
    }
}

/// Parameters for leaving a team
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct LeaveTeamParams {
    /// ID of the team to leave
    pub team_id: i64,
}

impl LeaveTeamParams {
    fn to_request(&self) -> BackendRequest {
        BackendRequest::post(format!("/api/v1/teams/{}/members/leave", self.team_id))
    }
}

/// Parameters for uploading a document
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UploadDocumentParams {
    /// Content of the file to upload
    pub file_content: String,
    /// File name recorded for the document
    #[serde(default)]
    pub file_name: Option<String>,
    /// Description recorded for the document
    #[serde(default)]
    pub description: Option<String>,
}

impl UploadDocumentParams {
    fn to_request(&self) -> BackendRequest {
        BackendRequest::post("/api/v1/documents/upload")
            .query_opt("fileName", self.file_name.as_deref())
            .query_opt("description", self.description.as_deref())
            .file(self.file_content.clone().into_bytes())
    }
}

/// Lifecycle states a document listing can be filtered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentStatus {
    Uploading,
    Active,
    Deleted,
    Processing,
}

impl DocumentStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Uploading => "UPLOADING",
            Self::Active => "ACTIVE",
            Self::Deleted => "DELETED",
            Self::Processing => "PROCESSING",
        }
    }
}

/// Parameters for listing documents
#[derive(Debug, Clone, Deserialize, JsonSchema, Default)]
pub struct GetDocumentsParams {
    /// Only include documents in this status
    #[serde(default)]
    pub status: Option<DocumentStatus>,
}

impl GetDocumentsParams {
    fn to_request(&self) -> BackendRequest {
        BackendRequest::get("/api/v1/documents")
            .query_opt("status", self.status.map(DocumentStatus::as_str))
    }
}

/// Parameters for generating a shareable document link
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ShareDocumentParams {
    /// ID of the document to share
    pub document_id: i64,
    /// Minutes until the share link expires
    #[serde(default)]
    pub expiration_minutes: Option<u32>,
}

impl ShareDocumentParams {
    fn to_request(&self) -> BackendRequest {
        BackendRequest::get("/api/v1/documents/share")
            .query("documentId", self.document_id)
            .query_opt("expirationMinutes", self.expiration_minutes)
    }
}

/// Parameters for fetching download metadata
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DownloadDocumentMetadataParams {
    /// ID of the document
    pub document_id: i64,
}

impl DownloadDocumentMetadataParams {
    fn to_request(&self) -> BackendRequest {
        BackendRequest::get(format!("/api/v1/documents/download/{}", self.document_id))
    }
}

/// Parameters for downloading document content
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DownloadDocumentContentParams {
    /// ID of the document
    pub document_id: i64,
}

/// Parameters for deleting a document
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DeleteDocumentParams {
    /// ID of the document to delete
    pub document_id: i64,
}

impl DeleteDocumentParams {
    fn to_request(&self) -> BackendRequest {
        BackendRequest::delete(format!("/api/v1/documents/{}", self.document_id))
    }
}

/// Parameters for fetching logs of a document
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetLogsDocumentsParams {
    /// ID of the document whose logs to fetch
    pub document_id: i64,
}

impl GetLogsDocumentsParams {
    fn to_request(&self) -> BackendRequest {
        BackendRequest::get("/api/v1/logs/documents").query("documentId", self.document_id)
    }
}

/// Aggregation period for log counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogPeriod {
    Week,
    Month,
}

impl LogPeriod {
    fn as_str(self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

/// Parameters for counting logs
#[derive(Debug, Clone, Deserialize, JsonSchema, Default)]
pub struct GetLogsCountParams {
    /// Period to count logs over
    #[serde(default)]
    pub period: Option<LogPeriod>,
}

impl GetLogsCountParams {
    fn to_request(&self) -> BackendRequest {
        BackendRequest::post("/api/v1/logs/count")
            .query_opt("period", self.period.map(LogPeriod::as_str))
    }
}

// ============================================================================
// Request context helpers
// ============================================================================

/// Read the inbound `authorization` header from the HTTP request parts the
/// streamable-http transport stores in the request extensions.
fn inbound_authorization(ctx: &RequestContext<RoleServer>) -> Result<String, McpError> {
    let parts = ctx
        .extensions
        .get::<http::request::Parts>()
        .ok_or_else(|| McpError::internal_error("HTTP request context is unavailable", None))?;
    let value = parts
        .headers
        .get(http::header::AUTHORIZATION)
        .ok_or_else(|| McpError::invalid_request("missing authorization header", None))?;
    let value = value.to_str().map_err(|_| {
        McpError::invalid_request("authorization header is not valid UTF-8", None)
    })?;
    Ok(value.to_string())
}

fn backend_error(err: BackendError) -> McpError {
    McpError::internal_error(err.to_string(), None)
}

// ============================================================================
// NTDoc MCP Server Handler
// ============================================================================

/// NTDoc MCP server - forwards each tool call to the NTDoc REST backend with
/// the caller's bearer token passed through.
#[derive(Clone)]
pub struct NtdocBridgeServer {
    backend: BackendClient,
    server_name: String,
    tool_router: ToolRouter<Self>,
}

impl NtdocBridgeServer {
    pub fn new(server_name: impl Into<String>, backend: BackendClient) -> Self {
        Self {
            backend,
            server_name: server_name.into(),
            tool_router: Self::tool_router(),
        }
    }

    /// Forward one described request and relay the backend's JSON response.
    async fn forward(
        &self,
        ctx: &RequestContext<RoleServer>,
        request: BackendRequest,
    ) -> Result<CallToolResult, McpError> {
        let authorization = inbound_authorization(ctx)?;
        let value = self
            .backend
            .send_json(request, &authorization)
            .await
            .map_err(backend_error)?;
        Ok(CallToolResult::success(vec![Content::text(
            serde_json::to_string_pretty(&value).unwrap_or_default(),
        )]))
    }
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl NtdocBridgeServer {
    // ========================================================================
    // Teams
    // ========================================================================

    #[tool(
        name = "get-team-by-id",
        description = "Fetch a team by its ID.",
        annotations(read_only_hint = true, destructive_hint = false)
    )]
    async fn get_team_by_id(
        &self,
        params: Parameters<GetTeamByIdParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(&ctx, params.0.to_request()).await
    }

    #[tool(
        name = "update-team-by-id",
        description = "Update a team's information by its ID.",
        annotations(read_only_hint = false, destructive_hint = false)
    )]
    async fn update_team_by_id(
        &self,
        params: Parameters<UpdateTeamByIdParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(&ctx, params.0.to_request()).await
    }

    #[tool(
        name = "delete-team-by-id",
        description = "Delete a team by its ID.",
        annotations(read_only_hint = false, destructive_hint = true)
    )]
    async fn delete_team_by_id(
        &self,
        params: Parameters<DeleteTeamByIdParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(&ctx, params.0.to_request()).await
    }

    #[tool(
        name = "get-teams",
        description = "Fetch a list of teams.",
        annotations(read_only_hint = true, destructive_hint = false)
    )]
    async fn get_teams(
        &self,
        params: Parameters<GetTeamsParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(&ctx, params.0.to_request()).await
    }

    #[tool(
        name = "create-team",
        description = "Create a new team.",
        annotations(read_only_hint = false, destructive_hint = false)
    )]
    async fn create_team(
        &self,
        params: Parameters<CreateTeamParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(&ctx, params.0.to_request()).await
    }

    // ========================================================================
    // Team members
    // ========================================================================

    #[tool(
        name = "update-team-member-role",
        description = "Update a team member's role.",
        annotations(read_only_hint = false, destructive_hint = false)
    )]
    async fn update_team_member_role(
        &self,
        params: Parameters<UpdateTeamMemberRoleParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(&ctx, params.0.to_request()).await
    }

    #[tool(
        name = "remove-team-member",
        description = "Remove a member from a team.",
        annotations(read_only_hint = false, destructive_hint = true)
    )]
    async fn remove_team_member(
        &self,
        params: Parameters<RemoveTeamMemberParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(&ctx, params.0.to_request()).await
    }

    #[tool(
        name = "get-team-members",
        description = "Fetch members of a team.",
        annotations(read_only_hint = true, destructive_hint = false)
    )]
    async fn get_team_members(
        &self,
        params: Parameters<GetTeamMembersParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(&ctx, params.0.to_request()).await
    }

    #[tool(
        name = "add-team-member",
        description = "Add a member to a team.",
        annotations(read_only_hint = false, destructive_hint = false)
    )]
    async fn add_team_member(
        &self,
        params: Parameters<AddTeamMemberParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(&ctx, params.0.to_request()).await
    }

    #[tool(
        name = "leave-team",
        description = "Leave a team.",
        annotations(read_only_hint = false, destructive_hint = false)
    )]
    async fn leave_team(
        &self,
        params: Parameters<LeaveTeamParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(&ctx, params.0.to_request()).await
    }

    // ========================================================================
    // Documents
    // ========================================================================

    #[tool(
        name = "upload-document",
        description = "Upload a document.",
        annotations(read_only_hint = false, destructive_hint = false)
    )]
    async fn upload_document(
        &self,
        params: Parameters<UploadDocumentParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(&ctx, params.0.to_request()).await
    }

    #[tool(
        name = "get-documents",
        description = "Fetch a list of documents.",
        annotations(read_only_hint = true, destructive_hint = false)
    )]
    async fn get_documents(
        &self,
        params: Parameters<GetDocumentsParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(&ctx, params.0.to_request()).await
    }

    #[tool(
        name = "share-document",
        description = "Generate a shareable link for a document.",
        annotations(read_only_hint = true, destructive_hint = false)
    )]
    async fn share_document(
        &self,
        params: Parameters<ShareDocumentParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(&ctx, params.0.to_request()).await
    }

    #[tool(
        name = "download-document-metadata",
        description = "Download metadata for a document.",
        annotations(read_only_hint = true, destructive_hint = false)
    )]
    async fn download_document_metadata(
        &self,
        params: Parameters<DownloadDocumentMetadataParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(&ctx, params.0.to_request()).await
    }

    #[tool(
        name = "download-document-content",
        description = "Download the content of a document. Returns the raw file content base64-encoded.",
        annotations(read_only_hint = true, destructive_hint = false)
    )]
    async fn download_document_content(
        &self,
        params: Parameters<DownloadDocumentContentParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let authorization = inbound_authorization(&ctx)?;
        let content = self
            .backend
            .download_content(params.0.document_id, &authorization)
            .await
            .map_err(backend_error)?;
        Ok(CallToolResult::success(vec![Content::text(
            BASE64.encode(&content),
        )]))
    }

    #[tool(
        name = "delete-document",
        description = "Delete a document.",
        annotations(read_only_hint = false, destructive_hint = true)
    )]
    async fn delete_document(
        &self,
        params: Parameters<DeleteDocumentParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(&ctx, params.0.to_request()).await
    }

    // ========================================================================
    // Logs
    // ========================================================================

    #[tool(
        name = "get-logs-list",
        description = "Fetch a list of logs.",
        annotations(read_only_hint = true, destructive_hint = false)
    )]
    async fn get_logs_list(
        &self,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(&ctx, BackendRequest::get("/api/v1/logs/list"))
            .await
    }

    #[tool(
        name = "get-logs-documents",
        description = "Fetch log documents by document ID.",
        annotations(read_only_hint = true, destructive_hint = false)
    )]
    async fn get_logs_documents(
        &self,
        params: Parameters<GetLogsDocumentsParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(&ctx, params.0.to_request()).await
    }

    #[tool(
        name = "get-logs-count",
        description = "Fetch the count of logs over a specified period.",
        annotations(read_only_hint = true, destructive_hint = false)
    )]
    async fn get_logs_count(
        &self,
        params: Parameters<GetLogsCountParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(&ctx, params.0.to_request()).await
    }

    // ========================================================================
    // Auth
    // ========================================================================

    #[tool(
        name = "get-api-auth-me",
        description = "Fetch information about the authenticated user.",
        annotations(read_only_hint = true, destructive_hint = false)
    )]
    async fn get_api_auth_me(
        &self,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(&ctx, BackendRequest::get("/api/auth/me"))
            .await
    }
}

// ============================================================================
// ServerHandler Implementation
// ============================================================================

impl ServerHandler for NtdocBridgeServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: self.server_name.clone().into(),
                version: crate::VERSION.into(),
                title: Some("NTDoc MCP Server".into()),
                icons: None,
                website_url: None,
            },
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "NTDoc MCP server. Tools forward to the NTDoc document \
                 management backend with your bearer token: manage teams and \
                 their members, upload, share, download and delete documents, \
                 and inspect activity logs."
                    .into(),
            ),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools = self.tool_router.list_all();
        std::future::ready(Ok(ListToolsResult {
            tools,
            ..Default::default()
        }))
    }

    #[allow(clippy::manual_async_fn)]
    fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            let tool_context = ToolCallContext::new(self, request, context);
            self.tool_router.call(tool_context).await
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
