//! Project templates and the prompts that frame a build.
//!
//! The first exchange of a build asks the model to classify the request as a
//! `node` or `react` project. The chosen template contributes two things: the
//! prompts that give the model the starting files as context, and the
//! template artifact itself, which is parsed like any model reply and becomes
//! the first batch of steps.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BuildError, ModelCallKind};

/// System instruction for the template selection call.
pub const TEMPLATE_SELECTION_PROMPT: &str = "Return either node or react based on what do you think this project should be. Only return a single word either 'node' or 'react'. Do not return anything extra";

/// Preface prepended to each template artifact in the model-facing prompts.
pub const ARTIFACT_PREFACE: &str =
    "Here is an artifact that contains all files of the project visible to you.\n\n";

/// Design guidance sent ahead of react builds.
pub const BASE_PROMPT: &str = "For all designs I ask you to make, have them be beautiful, not cookie cutter. Make webpages that are fully featured and worthy for production.\n\nBy default, this template supports JSX syntax with Tailwind CSS classes, React hooks, and Lucide React for icons. Do not install other packages for UI themes, icons, etc unless absolutely necessary or I request them.\n\nUse icons from lucide-react for logos.\n\nUse stock photos from unsplash where appropriate, only valid URLs you know exist. Do not download the images, only link to them in image tags.\n\n";

/// System instruction for build and follow-up calls.
pub fn system_prompt() -> String {
    r#"You are an expert senior software engineer working inside an in-browser Node.js runtime. It runs JavaScript and WebAssembly only; there is no native binary execution, no pip, no git, and no C/C++ toolchain. Prefer Vite for web servers and Node scripts over shell scripts.

Reply with a single artifact describing every change:

<artifact id="kebab-case-id" title="Short title">
  <action type="file" filePath="relative/path.ext">
FULL file contents
  </action>
  <action type="shell">
npm install
  </action>
</artifact>

Rules:
- filePath is relative to the project root and never starts with a slash.
- Always write the complete, updated contents of a file; never use placeholders such as "rest of the code remains the same".
- Order actions so that files exist before commands that need them, and add dependencies to package.json before installing.
- Do not start a dev server that is already running; the preview restarts it on file changes.
- Keep prose before and after the artifact short. Never explain the artifact format itself."#
        .to_string()
}

/// Starting point for a generated project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum Template {
    Node,
    React,
}

impl FromStr for Template {
    type Err = BuildError;

    /// Parses the model's one-word answer.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_matches(|c| c == '\'' || c == '"' || c == '.').to_lowercase().as_str() {
            "node" => Ok(Template::Node),
            "react" => Ok(Template::React),
            other => Err(BuildError::model_call(ModelCallKind::MalformedPayload)
                .with_message(format!("expected 'node' or 'react', got '{other}'"))),
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Template::Node => "node",
            Template::React => "react",
        })
    }
}

/// Prompts produced by a template choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePrompts {
    pub template: Template,
    /// Sent to the model as user messages ahead of the user's own prompt
    pub prompts: Vec<String>,
    /// Parsed locally into the first batch of steps
    pub ui_prompts: Vec<String>,
}

impl Template {
    /// The template's starting files as an artifact.
    pub fn artifact(&self) -> &'static str {
        match self {
            Template::React => REACT_TEMPLATE,
            Template::Node => NODE_TEMPLATE,
        }
    }

    pub fn prompts(&self) -> TemplatePrompts {
        let with_preface = format!("{ARTIFACT_PREFACE}{}", self.artifact());
        let prompts = match self {
            Template::React => vec![BASE_PROMPT.to_string(), with_preface],
            Template::Node => vec![with_preface],
        };
        TemplatePrompts {
            template: *self,
            prompts,
            ui_prompts: vec![self.artifact().to_string()],
        }
    }
}

const REACT_TEMPLATE: &str = r#"<artifact id="project-import" title="Project Files">
<action type="file" filePath="eslint.config.js">import js from '@eslint/js';
import globals from 'globals';
import reactHooks from 'eslint-plugin-react-hooks';
import reactRefresh from 'eslint-plugin-react-refresh';
import tseslint from 'typescript-eslint';

export default tseslint.config(
  { ignores: ['dist'] },
  {
    extends: [js.configs.recommended, ...tseslint.configs.recommended],
    files: ['**/*.{ts,tsx}'],
    languageOptions: {
      ecmaVersion: 2020,
      globals: globals.browser,
    },
    plugins: {
      'react-hooks': reactHooks,
      'react-refresh': reactRefresh,
    },
    rules: {
      ...reactHooks.configs.recommended.rules,
      'react-refresh/only-export-components': ['warn', { allowConstantExport: true }],
    },
  }
);
</action>
<action type="file" filePath="index.html"><!doctype html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <link rel="icon" type="image/svg+xml" href="/vite.svg" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>Vite + React + TS</title>
  </head>
  <body>
    <div id="root"></div>
    <script type="module" src="/src/main.tsx"></script>
  </body>
</html>
</action>
<action type="file" filePath="package.json">{
  "name": "vite-react-typescript-starter",
  "private": true,
  "version": "0.0.0",
  "type": "module",
  "scripts": {
    "dev": "vite",
    "build": "vite build",
    "lint": "eslint .",
    "preview": "vite preview"
  },
  "dependencies": {
    "lucide-react": "^0.344.0",
    "react": "^18.3.1",
    "react-dom": "^18.3.1"
  },
  "devDependencies": {
    "@eslint/js": "^9.9.1",
    "@types/react": "^18.3.5",
    "@types/react-dom": "^18.3.0",
    "@vitejs/plugin-react": "^4.3.1",
    "autoprefixer": "^10.4.18",
    "eslint": "^9.9.1",
    "eslint-plugin-react-hooks": "^5.1.0-rc.0",
    "eslint-plugin-react-refresh": "^0.4.11",
    "globals": "^15.9.0",
    "postcss": "^8.4.35",
    "tailwindcss": "^3.4.1",
    "typescript": "^5.5.3",
    "typescript-eslint": "^8.3.0",
    "vite": "^5.4.2"
  }
}
</action>
<action type="file" filePath="postcss.config.js">export default {
  plugins: {
    tailwindcss: {},
    autoprefixer: {},
  },
};
</action>
<action type="file" filePath="tailwind.config.js">/** @type {import('tailwindcss').Config} */
export default {
  content: ['./index.html', './src/**/*.{js,ts,jsx,tsx}'],
  theme: {
    extend: {},
  },
  plugins: [],
};
</action>
<action type="file" filePath="tsconfig.json">{
  "compilerOptions": {
    "target": "ES2020",
    "useDefineForClassFields": true,
    "lib": ["ES2020", "DOM", "DOM.Iterable"],
    "module": "ESNext",
    "skipLibCheck": true,
    "moduleResolution": "bundler",
    "allowImportingTsExtensions": true,
    "isolatedModules": true,
    "moduleDetection": "force",
    "noEmit": true,
    "jsx": "react-jsx",
    "strict": true,
    "noUnusedLocals": true,
    "noUnusedParameters": true,
    "noFallthroughCasesInSwitch": true
  },
  "include": ["src"]
}
</action>
<action type="file" filePath="vite.config.ts">import { defineConfig } from 'vite';
import react from '@vitejs/plugin-react';

export default defineConfig({
  plugins: [react()],
  optimizeDeps: {
    exclude: ['lucide-react'],
  },
});
</action>
<action type="file" filePath="src/App.tsx">function App() {
  return (
    <div className="min-h-screen bg-gray-100 flex items-center justify-center">
      <p>Start prompting (or editing) to see magic happen :)</p>
    </div>
  );
}

export default App;
</action>
<action type="file" filePath="src/index.css">@tailwind base;
@tailwind components;
@tailwind utilities;
</action>
<action type="file" filePath="src/main.tsx">import { StrictMode } from 'react';
import { createRoot } from 'react-dom/client';
import App from './App.tsx';
import './index.css';

createRoot(document.getElementById('root')!).render(
  <StrictMode>
    <App />
  </StrictMode>
);
</action>
<action type="file" filePath="src/vite-env.d.ts">/// <reference types="vite/client" />
</action>
</artifact>"#;

const NODE_TEMPLATE: &str = r#"<artifact id="project-import" title="Project Files">
<action type="file" filePath="index.js">// run `node index.js` in the terminal

console.log(`Hello Node.js v${process.versions.node}!`);
</action>
<action type="file" filePath="package.json">{
  "name": "node-starter",
  "private": true,
  "scripts": {
    "test": "echo \"Error: no test specified\" && exit 1"
  }
}
</action>
</artifact>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parse_response;

    #[test]
    fn test_template_from_model_answer() {
        assert_eq!("react".parse::<Template>().unwrap(), Template::React);
        assert_eq!(" Node\n".parse::<Template>().unwrap(), Template::Node);
        assert_eq!("'react'.".parse::<Template>().unwrap(), Template::React);
        assert!(matches!(
            "python".parse::<Template>(),
            Err(BuildError::ModelCall {
                kind: ModelCallKind::MalformedPayload,
                ..
            })
        ));
    }

    #[test]
    fn test_react_prompts() {
        let prompts = Template::React.prompts();
        assert_eq!(prompts.prompts.len(), 2);
        assert_eq!(prompts.prompts[0], BASE_PROMPT);
        assert!(prompts.prompts[1].starts_with(ARTIFACT_PREFACE));
        assert_eq!(prompts.ui_prompts, vec![REACT_TEMPLATE.to_string()]);
    }

    #[test]
    fn test_node_prompts() {
        let prompts = Template::Node.prompts();
        assert_eq!(prompts.prompts.len(), 1);
        assert!(prompts.prompts[0].ends_with(NODE_TEMPLATE));
    }

    #[test]
    fn test_templates_parse_into_file_steps() {
        let react = parse_response(Template::React.artifact()).unwrap();
        assert_eq!(react.title(), Some("Project Files"));
        assert!(react.steps.iter().all(|s| s.path().is_some()));
        assert!(react.steps.iter().any(|s| s.path() == Some("src/App.tsx")));
        assert!(react.steps.iter().any(|s| s.path() == Some("package.json")));

        let node = parse_response(Template::Node.artifact()).unwrap();
        assert_eq!(node.steps.len(), 2);
    }
}
