/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth: Bearer トークン → AuthCtx (fail-open)
 * - cors / http / security_headers: 横断的な HTTP 層
 */
pub mod auth;
pub mod cors;
pub mod http;
pub mod security_headers;
