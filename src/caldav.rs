use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use reqwest::{Client, Method, Url};

use crate::auth::Credentials;
use crate::error::{SettingsError, Result, check_caldav_response};
use crate::import::{CalendarDiscovery, RemoteCalendar};
use crate::logging::{log_request, log_response};

const PRINCIPAL_BODY: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<d:propfind xmlns:d="DAV:">
  <d:prop>
    <d:current-user-principal/>
  </d:prop>
</d:propfind>"#;

const CALENDAR_HOME_BODY: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<d:propfind xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
  <d:prop>
    <c:calendar-home-set/>
  </d:prop>
</d:propfind>"#;

const CALENDAR_LIST_BODY: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<d:propfind xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav" xmlns:ic="http://apple.com/ns/ical/">
  <d:prop>
    <d:displayname/>
    <d:resourcetype/>
    <c:supported-calendar-component-set/>
    <ic:calendar-color/>
  </d:prop>
</d:propfind>"#;

/// Discovers the calendars of a CalDAV account
#[derive(Debug, Clone, Default)]
pub struct CalDavClient {
    client: Client,
}

impl CalDavClient {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }

    /// Walk principal → calendar home → calendar collections
    pub async fn discover_calendars(
        &self,
        credentials: &Credentials,
        endpoint: &str,
    ) -> Result<Vec<RemoteCalendar>> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| SettingsError::InvalidUrl(format!("{}: {}", endpoint, e)))?;

        let principal = self.discover_principal(credentials, &endpoint).await?;
        let calendar_home = self.get_calendar_home(credentials, &principal).await?;
        self.list_calendars(credentials, &calendar_home).await
    }

    async fn discover_principal(&self, credentials: &Credentials, endpoint: &Url) -> Result<Url> {
        let xml = self
            .propfind(credentials, endpoint, "0", PRINCIPAL_BODY, "Principal discovery failed")
            .await?;
        let href = extract_href(&xml, "current-user-principal")
            .ok_or_else(|| SettingsError::CalDav("Could not find principal URL".to_string()))?;
        resolve_url(endpoint, &href)
    }

    async fn get_calendar_home(&self, credentials: &Credentials, principal: &Url) -> Result<Url> {
        let xml = self
            .propfind(credentials, principal, "0", CALENDAR_HOME_BODY, "Calendar home discovery failed")
            .await?;
        let href = extract_href(&xml, "calendar-home-set")
            .ok_or_else(|| SettingsError::CalDav("Could not find calendar home".to_string()))?;
        resolve_url(principal, &href)
    }

    async fn list_calendars(&self, credentials: &Credentials, home: &Url) -> Result<Vec<RemoteCalendar>> {
        let xml = self
            .propfind(credentials, home, "1", CALENDAR_LIST_BODY, "Calendar list failed")
            .await?;
        parse_calendar_list(&xml, home)
    }

    async fn propfind(
        &self,
        credentials: &Credentials,
        url: &Url,
        depth: &str,
        body: &'static str,
        context: &str,
    ) -> Result<String> {
        let method = Method::from_bytes(b"PROPFIND")
            .map_err(|e| SettingsError::CalDav(format!("PROPFIND: {}", e)))?;

        log_request("PROPFIND", url.as_str());
        let response = self
            .client
            .request(method, url.clone())
            .header("Authorization", credentials.auth_header())
            .header("Content-Type", "application/xml; charset=utf-8")
            .header("Depth", depth)
            .body(body)
            .send()
            .await?;
        log_response(response.status().as_u16(), url.as_str());

        check_caldav_response(response, context).await
    }
}

#[async_trait(?Send)]
impl CalendarDiscovery for CalDavClient {
    async fn discover(&self, credentials: &Credentials, endpoint: &str) -> Result<Vec<RemoteCalendar>> {
        self.discover_calendars(credentials, endpoint).await
    }
}

/// Resolve an href against the URL it was returned for
fn resolve_url(base: &Url, href: &str) -> Result<Url> {
    base.join(href.trim())
        .map_err(|e| SettingsError::InvalidUrl(format!("{}: {}", href, e)))
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_string()
}

/// Value of the `name` attribute on a `<comp>` element
fn component_name(e: &BytesStart) -> Option<String> {
    let attr = e.try_get_attribute("name").ok()??;
    attr.unescape_value().ok().map(|v| v.to_string())
}

#[derive(Default)]
struct ResponseBuilder {
    href: Option<String>,
    name: Option<String>,
    color: Option<String>,
    is_calendar: bool,
    components: Option<Vec<String>>,
}

impl ResponseBuilder {
    fn open_element(&mut self, e: &BytesStart, name: &str) {
        match name {
            "calendar" => self.is_calendar = true,
            "supported-calendar-component-set" => {
                self.components.get_or_insert_with(Vec::new);
            }
            "comp" => {
                if let Some(component) = component_name(e) {
                    self.components.get_or_insert_with(Vec::new).push(component);
                }
            }
            _ => {}
        }
    }

    /// Only calendars that can hold events; a missing component set means
    /// the server accepts every component
    fn supports_events(&self) -> bool {
        self.components
            .as_ref()
            .is_none_or(|components| components.iter().any(|c| c.eq_ignore_ascii_case("VEVENT")))
    }
}

/// Parse the Depth 1 PROPFIND of a calendar home into event calendars
fn parse_calendar_list(xml: &str, home: &Url) -> Result<Vec<RemoteCalendar>> {
    let mut calendars = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut current: Option<ResponseBuilder> = None;
    let mut current_tag = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                if name == "response" {
                    current = Some(ResponseBuilder::default());
                } else if let Some(builder) = current.as_mut() {
                    builder.open_element(&e, &name);
                }
                current_tag = name;
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(&e);
                if let Some(builder) = current.as_mut() {
                    builder.open_element(&e, &name);
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if name == "response"
                    && let Some(builder) = current.take()
                    && builder.is_calendar
                    && builder.supports_events()
                    && let Some(href) = builder.href.as_deref()
                {
                    calendars.push(RemoteCalendar {
                        url: resolve_url(home, href)?.to_string(),
                        display_name: builder.name.clone(),
                        color: builder.color.clone(),
                    });
                }
                current_tag.clear();
            }
            Ok(Event::Text(e)) => {
                if let Some(builder) = current.as_mut() {
                    let text = e.unescape().unwrap_or_default().to_string();
                    match current_tag.as_str() {
                        "href" if builder.href.is_none() => builder.href = Some(text),
                        "displayname" => builder.name = Some(text),
                        "calendar-color" => builder.color = Some(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(calendars)
}

/// Extract the first href nested in `parent_tag`
fn extract_href(xml: &str, parent_tag: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut in_parent = false;
    let mut in_href = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                if name == parent_tag {
                    in_parent = true;
                } else if name == "href" && in_parent {
                    in_href = true;
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if name == parent_tag {
                    in_parent = false;
                } else if name == "href" {
                    in_href = false;
                }
            }
            Ok(Event::Text(e)) => {
                if in_href {
                    return Some(e.unescape().unwrap_or_default().to_string());
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CALENDAR_LIST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:multistatus xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav" xmlns:ic="http://apple.com/ns/ical/">
  <d:response>
    <d:href>/calendars/alice/</d:href>
    <d:propstat>
      <d:prop>
        <d:resourcetype><d:collection/></d:resourcetype>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
  <d:response>
    <d:href>/calendars/alice/work/</d:href>
    <d:propstat>
      <d:prop>
        <d:displayname>Work</d:displayname>
        <d:resourcetype><d:collection/><c:calendar/></d:resourcetype>
        <c:supported-calendar-component-set><c:comp name="VEVENT"/></c:supported-calendar-component-set>
        <ic:calendar-color>#FF2968FF</ic:calendar-color>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
  <d:response>
    <d:href>/calendars/alice/tasks/</d:href>
    <d:propstat>
      <d:prop>
        <d:displayname>Tasks</d:displayname>
        <d:resourcetype><d:collection/><c:calendar/></d:resourcetype>
        <c:supported-calendar-component-set><c:comp name="VTODO"/></c:supported-calendar-component-set>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
  <d:response>
    <d:href>https://other.example.com/calendars/alice/family/</d:href>
    <d:propstat>
      <d:prop>
        <d:resourcetype><d:collection/><c:calendar/></d:resourcetype>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
    <d:propstat>
      <d:prop><d:displayname/><ic:calendar-color/></d:prop>
      <d:status>HTTP/1.1 404 Not Found</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;

    #[test]
    fn test_parse_calendar_list_keeps_event_calendars() {
        let home = Url::parse("https://dav.example.com/calendars/alice/").unwrap();
        let calendars = parse_calendar_list(CALENDAR_LIST, &home).unwrap();

        assert_eq!(calendars.len(), 2);
        assert_eq!(calendars[0].url, "https://dav.example.com/calendars/alice/work/");
        assert_eq!(calendars[0].display_name.as_deref(), Some("Work"));
        assert_eq!(calendars[0].color.as_deref(), Some("#FF2968FF"));
        assert_eq!(calendars[1].url, "https://other.example.com/calendars/alice/family/");
        assert_eq!(calendars[1].display_name, None);
    }

    #[test]
    fn test_extract_href() {
        let xml = r#"<d:multistatus xmlns:d="DAV:">
  <d:response>
    <d:href>/</d:href>
    <d:propstat><d:prop>
      <d:current-user-principal><d:href>/principals/alice/</d:href></d:current-user-principal>
    </d:prop></d:propstat>
  </d:response>
</d:multistatus>"#;
        assert_eq!(
            extract_href(xml, "current-user-principal"),
            Some("/principals/alice/".to_string())
        );
        assert_eq!(extract_href(xml, "calendar-home-set"), None);
    }

    #[test]
    fn test_malformed_calendar_list() {
        let home = Url::parse("https://dav.example.com/calendars/alice/").unwrap();
        let xml = r#"<d:multistatus xmlns:d="DAV:"><d:response><d:href>/x/</d:href></d:multistatus>"#;

        let result = parse_calendar_list(xml, &home);

        assert!(matches!(result, Err(SettingsError::Xml(_))));
    }

    #[tokio::test]
    async fn test_discover_calendars() {
        let mock_server = MockServer::start().await;
        let credentials = Credentials::basic("alice", "secret");

        Mock::given(method("PROPFIND"))
            .and(path("/dav/"))
            .and(header("Authorization", credentials.auth_header().as_str()))
            .respond_with(ResponseTemplate::new(207).set_body_string(
                r#"<d:multistatus xmlns:d="DAV:"><d:response><d:href>/dav/</d:href><d:propstat><d:prop>
<d:current-user-principal><d:href>/principals/alice/</d:href></d:current-user-principal>
</d:prop></d:propstat></d:response></d:multistatus>"#,
            ))
            .mount(&mock_server)
            .await;

        Mock::given(method("PROPFIND"))
            .and(path("/principals/alice/"))
            .respond_with(ResponseTemplate::new(207).set_body_string(
                r#"<d:multistatus xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav"><d:response><d:href>/principals/alice/</d:href><d:propstat><d:prop>
<c:calendar-home-set><d:href>/calendars/alice/</d:href></c:calendar-home-set>
</d:prop></d:propstat></d:response></d:multistatus>"#,
            ))
            .mount(&mock_server)
            .await;

        Mock::given(method("PROPFIND"))
            .and(path("/calendars/alice/"))
            .and(header("Depth", "1"))
            .respond_with(ResponseTemplate::new(207).set_body_string(CALENDAR_LIST))
            .mount(&mock_server)
            .await;

        let client = CalDavClient::new();
        let endpoint = format!("{}/dav/", mock_server.uri());
        let calendars = client.discover_calendars(&credentials, &endpoint).await.unwrap();

        assert_eq!(calendars.len(), 2);
        assert_eq!(calendars[0].url, format!("{}/calendars/alice/work/", mock_server.uri()));
    }

    #[tokio::test]
    async fn test_discover_unauthorized() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PROPFIND"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let client = CalDavClient::new();
        let result = client
            .discover_calendars(&Credentials::basic("alice", "wrong"), &mock_server.uri())
            .await;

        assert!(matches!(result, Err(SettingsError::Auth(_))));
    }

    #[tokio::test]
    async fn test_discover_invalid_endpoint() {
        let client = CalDavClient::new();
        let result = client
            .discover_calendars(&Credentials::basic("alice", "secret"), "not a url")
            .await;
        assert!(matches!(result, Err(SettingsError::InvalidUrl(_))));
    }
}
