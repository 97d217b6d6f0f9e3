// GROQ queries for the blog pages. Experiment arms arrive as the
// `$imageFlag`/`$imageVariation` and `$nameFlag`/`$nameVariation` params.

const IMAGE_FRAGMENT: &str = r#"
  "url": asset->url,
  "alt": coalesce(alt, asset->altText),
  "width": asset->metadata.dimensions.width,
  "height": asset->metadata.dimensions.height
"#;

const RICH_TEXT_FRAGMENT: &str = r#"
  richText[]{
    ...,
    _type == "image" => {
      _type,
      _key,
      "url": asset->url,
      "alt": coalesce(alt, asset->altText)
    },
    markDefs[]{
      ...,
      _type == "customLink" => {
        _key,
        _type,
        "href": select(
          urlType == "internal" => internal->slug.current,
          url
        )
      }
    }
  }
"#;

pub fn blog_index_page_query() -> String {
    format!(
        r#"*[_type == "blogIndex"][0]{{
  _id,
  _type,
  title,
  description,
  displayFeaturedBlogs,
  "featuredBlogsCount": coalesce(
    experiments[flag == $imageFlag && variation == $imageVariation][0].featuredBlogsCount,
    featuredBlogsCount
  ),
  "blogs": *[_type == "blog" && (seoHideFromLists != true)] | order(orderRank asc){{
    _id,
    title,
    description,
    "slug": slug.current,
    publishedAt,
    "image": select($imageVariation != "hidden" => image{{ {image} }}),
    "authors": authors[0]->{{
      "name": select($nameVariation == "short" => string::split(name, " ")[0], name),
      position,
      "image": image{{ {image} }}
    }}
  }},
  pageBuilder[]{{
    ...,
    _type,
    "image": image{{ {image} }},
    {rich_text}
  }}
}}"#,
        image = IMAGE_FRAGMENT,
        rich_text = RICH_TEXT_FRAGMENT
    )
}

pub fn blog_slug_page_query() -> String {
    format!(
        r#"*[_type == "blog" && slug.current == $slug][0]{{
  _id,
  _type,
  title,
  description,
  "slug": slug.current,
  publishedAt,
  "image": select($imageVariation != "hidden" => image{{ {image} }}),
  {rich_text},
  "authors": authors[0]->{{
    "name": select($nameVariation == true => name + " (" + position + ")", name),
    position,
    "image": image{{ {image} }}
  }}
}}"#,
        image = IMAGE_FRAGMENT,
        rich_text = RICH_TEXT_FRAGMENT
    )
}

pub const BLOG_PATHS_QUERY: &str = r#"*[_type == "blog" && defined(slug.current)].slug.current"#;
