use std::{path::PathBuf, sync::Arc};

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::Request,
    http::{Response, StatusCode},
};
use serde_json::{Value, json};
use tower::util::ServiceExt;

use pressnote::{
    api,
    state::AppState,
    storage::{init_db_from_env, migrate},
    uploads::Uploads,
};

const USER_ID: &str = "00000000-0000-0000-0000-000000000001";

struct TestApp {
    router: Router,
    provisional: PathBuf,
    durable: PathBuf,
    _dir: tempfile::TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let db = init_db_from_env().await;

        migrate(&db, "sql/01-CREATE_TABLE.sql")
            .await
            .expect("初始化sql失败");

        // 清掉上一轮残留的数据
        sqlx::query("TRUNCATE TABLE articles, categories, authors")
            .execute(&db)
            .await
            .expect("清空表失败");

        let dir = tempfile::tempdir().expect("tempdir");
        let provisional = dir.path().join("temp");
        let durable = dir.path().join("uploads");

        let uploads = Uploads::new(provisional.clone(), durable.clone())
            .await
            .expect("初始化上传目录失败");

        let state = AppState::new(db, Arc::new(uploads));
        let router = Router::new().nest("/api", api::setup_route()).with_state(state);

        Self {
            router,
            provisional,
            durable,
            _dir: dir,
        }
    }

    async fn request(&self, req: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(req)
            .await
            .expect("oneshot fail")
    }

    async fn body_json(resp: Response<Body>) -> Value {
        let data = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("读取数据失败");
        serde_json::from_slice(&data).expect("反序列化失败")
    }

    /// 往暂存目录里放一个待转存的文件
    fn seed_provisional(&self, name: &str) {
        std::fs::write(self.provisional.join(name), b"image-bytes").expect("写入暂存文件失败");
    }

    async fn get(&self, uri: &str) -> Response<Body> {
        let req = Request::get(uri).body(Body::empty()).expect("请求失败");
        self.request(req).await
    }

    async fn post_json(&self, uri: &str, body: Value) -> Response<Body> {
        let req = Request::post(uri)
            .header("Content-Type", "application/json")
            .header("x-user-id", USER_ID)
            .body(Body::new(body.to_string()))
            .expect("请求失败");
        self.request(req).await
    }

    async fn put_json(&self, uri: &str, body: Value) -> Response<Body> {
        let req = Request::put(uri)
            .header("Content-Type", "application/json")
            .header("x-user-id", USER_ID)
            .body(Body::new(body.to_string()))
            .expect("请求失败");
        self.request(req).await
    }

    async fn patch(&self, uri: &str) -> Response<Body> {
        let req = Request::patch(uri)
            .header("x-user-id", USER_ID)
            .body(Body::empty())
            .expect("请求失败");
        self.request(req).await
    }

    async fn delete(&self, uri: &str) -> Response<Body> {
        let req = Request::delete(uri)
            .header("x-user-id", USER_ID)
            .body(Body::empty())
            .expect("请求失败");
        self.request(req).await
    }

    async fn create_category(&self, name: &str) -> Value {
        let resp = self
            .post_json("/api/admin/categories", json!({ "name": name }))
            .await;
        assert_eq!(StatusCode::CREATED, resp.status(), "创建分类失败");
        Self::body_json(resp).await["data"].clone()
    }

    async fn create_article(&self, body: Value, msg: &str) -> Value {
        let resp = self.post_json("/api/admin/articles", body).await;
        assert_eq!(StatusCode::CREATED, resp.status(), "{}", msg);
        Self::body_json(resp).await["data"].clone()
    }
}

#[tokio::test]
#[ignore = "API测试 依赖真实数据库"]
async fn test_article_pipeline() {
    let app = TestApp::new().await;

    let category = app.create_category("Tutorial").await;
    let category_id = category["id"].as_str().expect("分类缺少id").to_string();

    // 带图创建草稿：slug 规范化、文件从暂存转到正式目录
    app.seed_provisional("cover-a.png");
    let first = app
        .create_article(
            json!({
                "title": "Hello World!!",
                "content": "The very first article body.",
                "category": "Tutorial",
                "author": "Ann",
                "featured_image": "cover-a.png",
                "is_published": false
            }),
            "创建第一篇文章",
        )
        .await;

    assert_eq!(first["slug"], "hello-world");
    assert_eq!(first["isPublished"], false);
    assert_eq!(first["image"], "cover-a.png");
    assert_eq!(first["author"]["name"], "Ann");
    assert!(app.durable.join("cover-a.png").exists(), "题图应已转存");
    assert!(
        !app.provisional.join("cover-a.png").exists(),
        "暂存文件应已移走"
    );

    // 同标题第二篇：slug 追加 -1 后缀
    let second = app
        .create_article(
            json!({
                "title": "Hello World!!",
                "content": "A body for the duplicate title.",
                "category": category_id,
                "author": "Ann",
                "is_published": false
            }),
            "创建同标题文章",
        )
        .await;
    assert_eq!(second["slug"], "hello-world-1");

    // 大小写不同的作者名复用同一条作者记录
    let third = app
        .create_article(
            json!({
                "title": "Intro To Testing",
                "content": "Another article body.",
                "category": "Tutorial",
                "author": "ann",
                "is_published": true
            }),
            "创建第三篇文章",
        )
        .await;
    assert_eq!(
        third["author"]["id"], first["author"]["id"],
        "作者应复用已有记录"
    );

    let resp = app.get("/api/admin/authors").await;
    assert_eq!(StatusCode::OK, resp.status());
    let authors = TestApp::body_json(resp).await;
    let authors = authors["data"].as_array().expect("作者列表");
    assert_eq!(authors.len(), 1, "不应产生第二条作者记录");
    assert_eq!(authors[0]["name"], "Ann", "库中写法保持不变");

    // 原标题重命名为自身：排除自身后 slug 不应追加后缀
    let first_id = first["id"].as_str().expect("文章缺少id").to_string();
    let resp = app
        .put_json(
            &format!("/api/admin/articles/{first_id}"),
            json!({ "title": "Hello World!!" }),
        )
        .await;
    assert_eq!(StatusCode::OK, resp.status(), "无操作重命名");
    let renamed = TestApp::body_json(resp).await;
    assert_eq!(renamed["data"]["slug"], "hello-world");

    // 翻转两次回到草稿，时间戳清空
    let resp = app
        .patch(&format!("/api/admin/articles/{first_id}/toggle-publish"))
        .await;
    assert_eq!(StatusCode::OK, resp.status());
    let toggled = TestApp::body_json(resp).await;
    assert_eq!(toggled["data"]["isPublished"], true);

    let resp = app
        .patch(&format!("/api/admin/articles/{first_id}/toggle-publish"))
        .await;
    let toggled = TestApp::body_json(resp).await;
    assert_eq!(toggled["data"]["isPublished"], false, "连翻两次应回到草稿");

    // 留在已发布状态，供相关文章和删除守卫断言
    app.patch(&format!("/api/admin/articles/{first_id}/toggle-publish"))
        .await;

    // id 与 slug 取到同一篇文章
    let by_id = app.get(&format!("/api/admin/articles/{first_id}")).await;
    assert_eq!(StatusCode::OK, by_id.status());
    let by_slug = app.get("/api/admin/articles/hello-world").await;
    assert_eq!(StatusCode::OK, by_slug.status());
    assert_eq!(
        TestApp::body_json(by_id).await["data"]["id"],
        TestApp::body_json(by_slug).await["data"]["id"],
    );

    // 前台看不到草稿
    let resp = app.get("/api/public/articles/hello-world-1").await;
    assert_eq!(StatusCode::NOT_FOUND, resp.status(), "草稿对前台不可见");

    // 相关文章：同分类、仅已发布、排除自身
    let third_id = third["id"].as_str().expect("文章缺少id").to_string();
    let resp = app
        .get(&format!("/api/public/articles/{third_id}/related"))
        .await;
    assert_eq!(StatusCode::OK, resp.status());
    let related = TestApp::body_json(resp).await;
    let related = related["data"].as_array().expect("相关文章列表");
    assert_eq!(related.len(), 1, "只应包含已发布的第一篇");
    assert_eq!(related[0]["id"].as_str(), Some(first_id.as_str()));

    // 已发布文章的作者署名（去重、升序）
    let resp = app.get("/api/public/authors").await;
    let names = TestApp::body_json(resp).await;
    let names = names["data"].as_array().expect("作者署名列表").clone();
    assert_eq!(names.len(), 2, "两篇已发布文章各有署名写法");
    assert!(names.contains(&json!("Ann")));
    assert!(names.contains(&json!("ann")));

    // 分页：3 篇文章，每页 2 条
    let resp = app.get("/api/admin/articles?page=1&limit=2").await;
    let listed = TestApp::body_json(resp).await;
    assert_eq!(listed["data"].as_array().expect("列表").len(), 2);
    assert_eq!(listed["pagination"]["totalItems"], 3);
    assert_eq!(listed["pagination"]["totalPages"], 2);
    assert_eq!(listed["pagination"]["hasNext"], true);
    assert_eq!(listed["pagination"]["hasPrev"], false);

    // 空更新被拒绝
    let second_id = second["id"].as_str().expect("文章缺少id").to_string();
    let resp = app
        .put_json(&format!("/api/admin/articles/{second_id}"), json!({}))
        .await;
    assert_eq!(StatusCode::BAD_REQUEST, resp.status(), "空更新");

    // 换图：新图落正式目录，旧图被清理
    app.seed_provisional("cover-c.png");
    let resp = app
        .put_json(
            &format!("/api/admin/articles/{first_id}"),
            json!({ "featured_image": "cover-c.png" }),
        )
        .await;
    assert_eq!(StatusCode::OK, resp.status(), "换图更新");
    let updated = TestApp::body_json(resp).await;
    assert_eq!(updated["data"]["image"], "cover-c.png");
    assert!(app.durable.join("cover-c.png").exists());
    assert!(!app.durable.join("cover-a.png").exists(), "旧图应被清理");
}

#[tokio::test]
#[ignore = "API测试 依赖真实数据库"]
async fn test_cleanup_and_delete_guards() {
    let app = TestApp::new().await;

    let category = app.create_category("News").await;
    let category_id = category["id"].as_str().expect("分类缺少id").to_string();

    // 清理不变式：分类无效时暂存文件被丢弃，正式目录不产生文件
    app.seed_provisional("orphan.png");
    let resp = app
        .post_json(
            "/api/admin/articles",
            json!({
                "title": "Never Lands",
                "content": "This write must fail.",
                "category": "no-such-category",
                "author": "Bob",
                "featured_image": "orphan.png",
                "is_published": true
            }),
        )
        .await;
    assert_eq!(StatusCode::BAD_REQUEST, resp.status(), "无效分类");
    assert!(
        !app.provisional.join("orphan.png").exists(),
        "失败后暂存文件应被丢弃"
    );
    assert!(
        !app.durable.join("orphan.png").exists(),
        "失败后不应产生正式文件"
    );

    // 删除守卫：分类下还有已发布文章时拒绝删除
    app.create_article(
        json!({
            "title": "Breaking Story",
            "content": "Published content.",
            "category": "News",
            "author": "Bob",
            "is_published": true
        }),
        "创建已发布文章",
    )
    .await;

    let resp = app
        .delete(&format!("/api/admin/categories/{category_id}"))
        .await;
    assert_eq!(StatusCode::BAD_REQUEST, resp.status(), "删除守卫应拒绝");

    let resp = app
        .get(&format!("/api/admin/categories/{category_id}"))
        .await;
    assert_eq!(StatusCode::OK, resp.status(), "分类应保持可见");

    // 作者删除守卫：还有文章引用时拒绝
    let resp = app.get("/api/admin/authors").await;
    let authors = TestApp::body_json(resp).await;
    let author_id = authors["data"][0]["id"].as_str().expect("作者id").to_string();

    let resp = app.delete(&format!("/api/admin/authors/{author_id}")).await;
    assert_eq!(StatusCode::BAD_REQUEST, resp.status(), "作者删除守卫应拒绝");

    // 文章删除：第二次删除同一篇应 404
    let resp = app.get("/api/admin/articles/breaking-story").await;
    let article_id = TestApp::body_json(resp).await["data"]["id"]
        .as_str()
        .expect("文章id")
        .to_string();

    let resp = app.delete(&format!("/api/admin/articles/{article_id}")).await;
    assert_eq!(StatusCode::OK, resp.status());
    let resp = app.delete(&format!("/api/admin/articles/{article_id}")).await;
    assert_eq!(StatusCode::NOT_FOUND, resp.status(), "重复删除");

    // 文章删完后作者可以删除
    let resp = app.delete(&format!("/api/admin/authors/{author_id}")).await;
    assert_eq!(StatusCode::OK, resp.status(), "无文章引用后可删除");

    // 未带认证头的后台写入被拒绝
    let req = Request::post("/api/admin/categories")
        .header("Content-Type", "application/json")
        .body(Body::new(json!({ "name": "Sports" }).to_string()))
        .expect("请求失败");
    let resp = app.request(req).await;
    assert_eq!(StatusCode::UNAUTHORIZED, resp.status(), "缺认证头");
}
