pub const FLAG_EVALUATION_COUNTER: &str = "blog_flag_evaluations_total";
pub const FLAG_CLIENT_INIT_COUNTER: &str = "blog_flag_client_init_total";
pub const IDENTITY_COOKIES_ISSUED_COUNTER: &str = "blog_identity_cookies_issued_total";
pub const CMS_FETCH_COUNTER: &str = "blog_cms_fetches_total";
pub const CMS_FETCH_DURATION: &str = "blog_cms_fetch_duration_seconds";
pub const PAGES_RENDERED_COUNTER: &str = "blog_pages_rendered_total";
