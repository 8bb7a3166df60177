use std::collections::HashMap;
use std::sync::Mutex;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, COOKIE, ORIGIN, REFERER, SET_COOKIE};
use reqwest::redirect::Policy;

use crate::models::errors::ApiError;
use crate::models::wire::ApiResponse;

/// 与原始协议一致的浏览器标识
const USER_AGENT: &str = "Mozilla/5.0 (Linux x86_64; rv:51.0) Gecko/20100101 Firefox/51.0";

/// 长轮询可能被远端挂起,总超时须大于服务端保持时间
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// 单次HTTP调用的描述
///
/// 握手中的302捕获依赖检查重定向而非跟随,因此每个请求
/// 可单独禁用重定向跟随,并声明自己接受的状态码集合。
#[derive(Debug, Clone)]
pub struct HttpRequest<'a> {
    pub url: &'a str,
    pub referer: Option<&'a str>,
    pub origin: Option<&'a str>,
    pub follow_redirects: bool,
    /// 为空时按2xx判定;非空时仅接受列出的状态码
    pub ok_statuses: &'a [u16],
}

impl<'a> HttpRequest<'a> {
    pub fn new(url: &'a str) -> Self {
        Self {
            url,
            referer: None,
            origin: None,
            follow_redirects: true,
            ok_statuses: &[],
        }
    }

    pub fn referer(mut self, referer: &'a str) -> Self {
        self.referer = Some(referer);
        self
    }

    pub fn origin(mut self, origin: &'a str) -> Self {
        self.origin = Some(origin);
        self
    }

    /// 禁用重定向跟随 (302捕获场景)
    pub fn no_redirect(mut self) -> Self {
        self.follow_redirects = false;
        self
    }

    /// 声明接受的状态码集合,覆盖默认的2xx判定
    pub fn accept(mut self, statuses: &'a [u16]) -> Self {
        self.ok_statuses = statuses;
        self
    }
}

/// HTTP传输层
///
/// 职责:
/// - 执行GET/POST并合并每次调用的头部
/// - 维护cookie罐: 每次请求带上全部cookie,每个响应的Set-Cookie回写
/// - 暴露完整cookie罐的字符串形式,供持久化与恢复
pub struct HttpClient {
    /// 自动跟随重定向的客户端
    client: reqwest::Client,
    /// 禁用重定向的客户端 (302捕获)
    raw_client: reqwest::Client,
    /// cookie罐,所有调用共享
    jar: Mutex<HashMap<String, String>>,
}

impl HttpClient {
    pub fn new() -> Result<Self, ApiError> {
        let builder = || {
            reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
        };
        let client = builder().build()?;
        let raw_client = builder().redirect(Policy::none()).build()?;
        Ok(Self {
            client,
            raw_client,
            jar: Mutex::new(HashMap::new()),
        })
    }

    // ------------------------------------------------------------------
    // cookie罐
    // ------------------------------------------------------------------

    /// 写入单个cookie
    pub fn set_cookie(&self, name: &str, value: &str) {
        let mut jar = self.jar.lock().expect("cookie罐锁中毒");
        jar.insert(name.to_string(), value.to_string());
    }

    /// 批量写入cookie
    pub fn set_cookies(&self, cookies: &[(&str, &str)]) {
        let mut jar = self.jar.lock().expect("cookie罐锁中毒");
        for (name, value) in cookies {
            jar.insert((*name).to_string(), (*value).to_string());
        }
    }

    /// 读取单个cookie
    pub fn cookie(&self, name: &str) -> Option<String> {
        let jar = self.jar.lock().expect("cookie罐锁中毒");
        jar.get(name).cloned()
    }

    /// 当前cookie罐的字符串形式,用于持久化
    pub fn cookie_string(&self) -> String {
        let jar = self.jar.lock().expect("cookie罐锁中毒");
        let mut pairs: Vec<_> = jar.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// 从持久化的文本块恢复cookie罐
    ///
    /// 返回解析出的键值对数量;0表示文本块无法解析。
    pub fn load_cookie_string(&self, blob: &str) -> usize {
        let parsed: HashMap<String, String> = blob
            .split(';')
            .filter_map(|pair| {
                let (k, v) = pair.trim().split_once('=')?;
                if k.is_empty() {
                    return None;
                }
                Some((k.to_string(), v.to_string()))
            })
            .collect();
        let count = parsed.len();
        if count > 0 {
            let mut jar = self.jar.lock().expect("cookie罐锁中毒");
            jar.extend(parsed);
        }
        count
    }

    /// 清空cookie罐 (cookie过期后重新登录前调用)
    pub fn clear_cookies(&self) {
        let mut jar = self.jar.lock().expect("cookie罐锁中毒");
        jar.clear();
    }

    /// 从响应头回写Set-Cookie
    fn absorb_cookies(&self, headers: &HeaderMap) {
        let mut jar = self.jar.lock().expect("cookie罐锁中毒");
        for value in headers.get_all(SET_COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            // 只取第一段 k=v,丢弃Path/Expires等属性
            let Some(pair) = raw.split(';').next() else {
                continue;
            };
            if let Some((k, v)) = pair.split_once('=') {
                let k = k.trim();
                if !k.is_empty() {
                    jar.insert(k.to_string(), v.trim().to_string());
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // 请求执行
    // ------------------------------------------------------------------

    fn pick(&self, follow_redirects: bool) -> &reqwest::Client {
        if follow_redirects {
            &self.client
        } else {
            &self.raw_client
        }
    }

    fn headers_for(&self, req: &HttpRequest<'_>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let cookie = self.cookie_string();
        if !cookie.is_empty() {
            if let Ok(v) = HeaderValue::from_str(&cookie) {
                headers.insert(COOKIE, v);
            }
        }
        if let Some(referer) = req.referer {
            if let Ok(v) = HeaderValue::from_str(referer) {
                headers.insert(REFERER, v);
            }
        }
        if let Some(origin) = req.origin {
            if let Ok(v) = HeaderValue::from_str(origin) {
                headers.insert(ORIGIN, v);
            }
        }
        headers
    }

    fn check_status(req: &HttpRequest<'_>, status: u16) -> Result<(), ApiError> {
        let ok = if req.ok_statuses.is_empty() {
            (200..300).contains(&status)
        } else {
            req.ok_statuses.contains(&status)
        };
        if ok {
            Ok(())
        } else {
            Err(ApiError::HttpStatus {
                status,
                url: req.url.to_string(),
            })
        }
    }

    /// GET,返回响应体文本
    pub async fn get_text(&self, req: HttpRequest<'_>) -> Result<String, ApiError> {
        let response = self
            .pick(req.follow_redirects)
            .get(req.url)
            .headers(self.headers_for(&req))
            .send()
            .await?;
        self.absorb_cookies(response.headers());
        Self::check_status(&req, response.status().as_u16())?;
        Ok(response.text().await?)
    }

    /// GET,返回原始字节 (二维码图片)
    pub async fn get_bytes(&self, req: HttpRequest<'_>) -> Result<Vec<u8>, ApiError> {
        let response = self
            .pick(req.follow_redirects)
            .get(req.url)
            .headers(self.headers_for(&req))
            .send()
            .await?;
        self.absorb_cookies(response.headers());
        Self::check_status(&req, response.status().as_u16())?;
        Ok(response.bytes().await?.to_vec())
    }

    /// GET,解析为通用JSON信封
    pub async fn get_json(&self, req: HttpRequest<'_>) -> Result<ApiResponse, ApiError> {
        let body = self.get_text(req).await?;
        tracing::debug!(body = %body, "GET响应");
        Ok(serde_json::from_str(&body)?)
    }

    /// POST表单,返回状态码与响应体文本
    ///
    /// 长轮询的504响应体可能为空,由调用方决定如何处理。
    pub async fn post_form_raw(
        &self,
        req: HttpRequest<'_>,
        fields: &[(&str, &str)],
    ) -> Result<(u16, String), ApiError> {
        let mut headers = self.headers_for(&req);
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded; charset=UTF-8"),
        );
        let response = self
            .pick(req.follow_redirects)
            .post(req.url)
            .headers(headers)
            .form(fields)
            .send()
            .await?;
        self.absorb_cookies(response.headers());
        let status = response.status().as_u16();
        Self::check_status(&req, status)?;
        Ok((status, response.text().await?))
    }

    /// POST表单,解析为通用JSON信封
    pub async fn post_form(
        &self,
        req: HttpRequest<'_>,
        fields: &[(&str, &str)],
    ) -> Result<ApiResponse, ApiError> {
        let (_, body) = self.post_form_raw(req, fields).await?;
        tracing::debug!(body = %body, "POST响应");
        Ok(serde_json::from_str(&body)?)
    }

    /// POST原始字符串体,解析为通用JSON信封
    ///
    /// 发送接口要求把信封JSON原样作为请求体,而非表单字段。
    pub async fn post_body(
        &self,
        req: HttpRequest<'_>,
        body: String,
    ) -> Result<ApiResponse, ApiError> {
        let mut headers = self.headers_for(&req);
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded; charset=UTF-8"),
        );
        let response = self
            .pick(req.follow_redirects)
            .post(req.url)
            .headers(headers)
            .body(body)
            .send()
            .await?;
        self.absorb_cookies(response.headers());
        let status = response.status().as_u16();
        Self::check_status(&req, status)?;
        let text = response.text().await?;
        tracing::debug!(body = %text, "POST响应");
        Ok(serde_json::from_str(&text)?)
    }
}
